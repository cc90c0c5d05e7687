// ==========================================
// 作物种植排产系统 - 日气象序列
// ==========================================
// 来源: 外部气象网关（缺测插补由网关负责,本系统只读）
// ==========================================

use crate::domain::error::{DomainError, DomainResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// WeatherRecord - 单日气象
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub temperature_2m_max: Option<f64>,
    #[serde(default)]
    pub temperature_2m_min: Option<f64>,
    #[serde(default)]
    pub temperature_2m_mean: Option<f64>,
    #[serde(default)]
    pub precipitation_sum: Option<f64>,
    #[serde(default)]
    pub sunshine_hours: Option<f64>,
}

impl WeatherRecord {
    /// 只含日均温的简化记录
    pub fn with_mean(date: NaiveDate, mean: f64) -> Self {
        Self {
            date,
            temperature_2m_max: Some(mean + 5.0),
            temperature_2m_min: Some(mean - 5.0),
            temperature_2m_mean: Some(mean),
            precipitation_sum: None,
            sunshine_hours: None,
        }
    }

    /// 日均温: 优先 mean,否则 (max+min)/2
    pub fn mean_temperature(&self) -> Option<f64> {
        self.temperature_2m_mean.or(match (self.temperature_2m_max, self.temperature_2m_min) {
            (Some(max), Some(min)) => Some((max + min) / 2.0),
            _ => None,
        })
    }
}

// ==========================================
// WeatherSeries - 按日期索引的气象序列
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSeries {
    records: BTreeMap<NaiveDate, WeatherRecord>,
}

impl WeatherSeries {
    /// 创建序列,日期重复视为输入错误
    pub fn new(records: Vec<WeatherRecord>) -> DomainResult<Self> {
        let mut map = BTreeMap::new();
        for record in records {
            let date = record.date;
            if map.insert(date, record).is_some() {
                return Err(DomainError::DuplicateWeatherDate(date));
            }
        }
        Ok(Self { records: map })
    }

    pub fn get(&self, date: NaiveDate) -> Option<&WeatherRecord> {
        self.records.get(&date)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.keys().next_back().copied()
    }

    /// 截取 [start, end] 区间
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            records: self
                .records
                .range(start..=end)
                .map(|(d, r)| (*d, r.clone()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeatherRecord> {
        self.records.values()
    }
}
