// ==========================================
// 作物种植排产系统 - CSV 气象网关
// ==========================================
// 布局: {dir}/{location_key}.csv,每个位置一个文件
// 表头: date,temperature_2m_max,temperature_2m_min,temperature_2m_mean,precipitation_sum,sunshine_hours
// 空单元格视为缺测（None）
// ==========================================

use crate::domain::weather::{WeatherRecord, WeatherSeries};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::WeatherGateway;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvWeatherGateway {
    dir: PathBuf,
}

impl CsvWeatherGateway {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, location_key: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", location_key))
    }
}

/// 解析 CSV 文本为气象记录
pub fn parse_weather_csv(raw: &str) -> RepositoryResult<Vec<WeatherRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());
    let mut records = Vec::new();
    for row in reader.deserialize::<WeatherRecord>() {
        records.push(row?);
    }
    Ok(records)
}

#[async_trait]
impl WeatherGateway for CsvWeatherGateway {
    async fn get_weather(
        &self,
        location_key: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<WeatherSeries> {
        let path = self.file_for(location_key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::NotFound {
                    entity: "WeatherSeries".to_string(),
                    id: location_key.to_string(),
                })
            }
            Err(e) => return Err(RepositoryError::IoError(format!("{}: {}", path.display(), e))),
        };

        let records: Vec<WeatherRecord> = parse_weather_csv(&raw)?
            .into_iter()
            .filter(|r| start <= r.date && r.date <= end)
            .collect();
        debug!(location = location_key, records = records.len(), "气象数据加载完成");
        Ok(WeatherSeries::new(records)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "date,temperature_2m_max,temperature_2m_min,temperature_2m_mean,precipitation_sum,sunshine_hours
2025-04-01,20.0,10.0,15.0,0.0,6.5
2025-04-02,22.0,12.0,,1.2,
2025-04-03,21.0,11.0,16.0,0.0,8.0
";

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    #[test]
    fn test_parse_handles_blank_cells() {
        let records = parse_weather_csv(CSV).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].temperature_2m_mean, None);
        assert_eq!(records[1].mean_temperature(), Some(17.0));
        assert_eq!(records[1].sunshine_hours, None);
    }

    #[tokio::test]
    async fn test_gateway_filters_range_per_location() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tokyo.csv"), CSV).unwrap();
        let gateway = CsvWeatherGateway::new(dir.path());

        let series = gateway.get_weather("tokyo", d(2), d(3)).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(d(2)));

        let err = gateway.get_weather("osaka", d(1), d(3)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_dates_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dup = format!("{}2025-04-03,21.0,11.0,16.0,0.0,8.0\n", CSV);
        std::fs::write(dir.path().join("tokyo.csv"), dup).unwrap();
        let err = CsvWeatherGateway::new(dir.path())
            .get_weather("tokyo", d(1), d(30))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));
    }
}
