//! # Core Service 設定
//!
//! 環境変数から Core Service サーバーとリマインダー処理の設定を読み込む。
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `CORE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `CORE_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `REMINDER_INTERVAL_HOURS` | No | リマインダー処理の実行間隔（デフォルト: 12） |
//! | `REMINDER_ENABLED` | No | リマインダー処理を起動するか（デフォルト: `true`） |

use std::{env, time::Duration};

use thiserror::Error;

/// リマインダー処理の既定の実行間隔（時間）
const DEFAULT_REMINDER_INTERVAL_HOURS: u64 = 12;

/// 設定読み込みのエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値の形式が不正
    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// リマインダー処理の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderConfig {
    /// 定期処理を起動するか
    pub enabled:  bool,
    /// 実行間隔
    pub interval: Duration,
}

/// Core Service サーバーの設定
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// データベース接続 URL
    pub database_url: String,
    /// リマインダー設定
    pub reminder:     ReminderConfig,
}

impl CoreConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// テストでプロセスの環境変数を書き換えずに済むよう、参照を注入できる。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("CORE_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_required(&lookup, "CORE_PORT")?;
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let interval_hours = match lookup("REMINDER_INTERVAL_HOURS") {
            Some(raw) => parse_value::<u64>("REMINDER_INTERVAL_HOURS", raw)?,
            None => DEFAULT_REMINDER_INTERVAL_HOURS,
        };
        if interval_hours == 0 {
            return Err(ConfigError::Invalid {
                name:  "REMINDER_INTERVAL_HOURS",
                value: "0".to_string(),
            });
        }
        let enabled = match lookup("REMINDER_ENABLED") {
            Some(raw) => parse_bool("REMINDER_ENABLED", raw)?,
            None => true,
        };

        Ok(Self {
            host,
            port,
            database_url,
            reminder: ReminderConfig {
                enabled,
                interval: Duration::from_secs(interval_hours * 60 * 60),
            },
        })
    }
}

fn parse_required<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<T, ConfigError> {
    let raw = lookup(name).ok_or(ConfigError::Missing(name))?;
    parse_value(name, raw)
}

fn parse_value<T: std::str::FromStr>(name: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}

fn parse_bool(name: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_必須項目だけで既定値が補われる() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("CORE_PORT", "13001"),
            ("DATABASE_URL", "postgres://localhost/simawa"),
        ]))
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 13001);
        assert_eq!(
            config.reminder,
            ReminderConfig {
                enabled:  true,
                interval: Duration::from_secs(12 * 60 * 60),
            }
        );
    }

    #[test]
    fn test_database_urlが未設定ならmissing() {
        let err = CoreConfig::from_lookup(lookup_from(&[("CORE_PORT", "13001")])).unwrap_err();

        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[rstest]
    #[case("CORE_PORT", "abc")]
    #[case("REMINDER_INTERVAL_HOURS", "0")]
    #[case("REMINDER_INTERVAL_HOURS", "-1")]
    #[case("REMINDER_ENABLED", "maybe")]
    fn test_不正な値はinvalid(#[case] name: &str, #[case] value: &str) {
        let mut pairs = vec![
            ("CORE_PORT", "13001"),
            ("DATABASE_URL", "postgres://localhost/simawa"),
        ];
        pairs.retain(|(k, _)| *k != name);
        pairs.push((name, value));

        let err = CoreConfig::from_lookup(lookup_from(&pairs)).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { name: n, .. } if n == name));
    }

    #[test]
    fn test_リマインダーは明示的に無効化できる() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("CORE_PORT", "13001"),
            ("DATABASE_URL", "postgres://localhost/simawa"),
            ("REMINDER_ENABLED", "false"),
            ("REMINDER_INTERVAL_HOURS", "1"),
        ]))
        .unwrap();

        assert!(!config.reminder.enabled);
        assert_eq!(config.reminder.interval, Duration::from_secs(3600));
    }
}
