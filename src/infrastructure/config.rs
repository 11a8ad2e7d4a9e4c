use crate::domain::accounting::TrailingWindow;
use crate::infrastructure::error::InfraError;
use chrono::NaiveTime;
use chrono_tz::Tz;
use std::fs;
use std::path::Path;

const AGENDA_JSON: &str = "agenda.json";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_SLOT_MINUTES: u32 = 30;
const DEFAULT_TRAILING_DAYS: u32 = 30;
const DEFAULT_BLOCK_DAY_END: &str = "23:59";

/// Resolved `agenda.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaConfig {
    pub timezone: Tz,
    pub default_slot_minutes: u32,
    pub default_window: TrailingWindow,
    pub block_day_end: NaiveTime,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            default_slot_minutes: DEFAULT_SLOT_MINUTES,
            default_window: TrailingWindow::Days(DEFAULT_TRAILING_DAYS),
            block_day_end: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

fn default_agenda() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "timezone": DEFAULT_TIMEZONE,
        "defaultSlotMinutes": DEFAULT_SLOT_MINUTES,
        "defaultTrailingDays": DEFAULT_TRAILING_DAYS,
        "blockDayEnd": DEFAULT_BLOCK_DAY_END
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(AGENDA_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_agenda())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn read_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn read_positive(value: &serde_json::Value, key: &str, path: &Path) -> Result<Option<u32>, InfraError> {
    let Some(raw) = value.get(key).filter(|raw| !raw.is_null()) else {
        return Ok(None);
    };
    raw.as_u64()
        .and_then(|number| u32::try_from(number).ok())
        .filter(|number| *number > 0)
        .map(Some)
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!("{key} must be a positive integer in {}", path.display()))
        })
}

pub fn parse_timezone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("unknown timezone '{name}': {error}")))
}

pub fn load_agenda_config(config_dir: &Path) -> Result<AgendaConfig, InfraError> {
    let path = config_dir.join(AGENDA_JSON);
    let agenda = read_config(&path)?;
    let defaults = AgendaConfig::default();

    let timezone = read_str(&agenda, "timezone")
        .map(parse_timezone)
        .transpose()?
        .unwrap_or(defaults.timezone);

    let default_window = match agenda.get("defaultTrailingDays") {
        Some(serde_json::Value::String(value)) => TrailingWindow::parse(value).ok_or_else(|| {
            InfraError::InvalidConfig(format!(
                "defaultTrailingDays must be a number of days or \"all\" in {}",
                path.display()
            ))
        })?,
        _ => read_positive(&agenda, "defaultTrailingDays", &path)?
            .map(TrailingWindow::Days)
            .unwrap_or(defaults.default_window),
    };

    let block_day_end = read_str(&agenda, "blockDayEnd")
        .map(|value| {
            NaiveTime::parse_from_str(value, "%H:%M").map_err(|error| {
                InfraError::InvalidConfig(format!("invalid blockDayEnd '{value}': {error}"))
            })
        })
        .transpose()?
        .unwrap_or(defaults.block_day_end);

    Ok(AgendaConfig {
        timezone,
        default_slot_minutes: read_positive(&agenda, "defaultSlotMinutes", &path)?
            .unwrap_or(defaults.default_slot_minutes),
        default_window,
        block_day_end,
    })
}

pub fn save_timezone(config_dir: &Path, timezone: &str) -> Result<Tz, InfraError> {
    let parsed = parse_timezone(timezone)?;
    let path = config_dir.join(AGENDA_JSON);
    let mut agenda = read_config(&path)?;
    let object = agenda.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert(
        "timezone".to_string(),
        serde_json::Value::String(parsed.name().to_string()),
    );

    let formatted = serde_json::to_string_pretty(&agenda)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(parsed)
}
