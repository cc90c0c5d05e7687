// ==========================================
// 作物种植排产系统 - 内存网关
// ==========================================
// 用途: 测试与嵌入式调用（数据由调用方一次性提供）
// 并发: RwLock 保护可写存储,读多写少
// ==========================================

use crate::domain::crop::CropRequirement;
use crate::domain::field::Field;
use crate::domain::interaction::InteractionRule;
use crate::domain::schedule::OptimizationSchedule;
use crate::domain::weather::WeatherSeries;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::{
    CropRequirementGateway, FieldGateway, InteractionRuleGateway, OptimizationResultGateway, WeatherGateway,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::RwLock;

fn lock_error<E: std::fmt::Display>(e: E) -> RepositoryError {
    RepositoryError::LockError(e.to_string())
}

// ==========================================
// InMemoryFieldGateway
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryFieldGateway {
    fields: Vec<Field>,
}

impl InMemoryFieldGateway {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

#[async_trait]
impl FieldGateway for InMemoryFieldGateway {
    async fn get_fields(&self, field_ids: &[String]) -> RepositoryResult<Vec<Field>> {
        field_ids
            .iter()
            .map(|id| {
                self.fields
                    .iter()
                    .find(|f| &f.field_id == id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::NotFound {
                        entity: "Field".to_string(),
                        id: id.clone(),
                    })
            })
            .collect()
    }

    async fn get_all_fields(&self) -> RepositoryResult<Vec<Field>> {
        Ok(self.fields.clone())
    }
}

// ==========================================
// InMemoryCropRequirementGateway
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryCropRequirementGateway {
    requirements: Vec<CropRequirement>,
}

impl InMemoryCropRequirementGateway {
    pub fn new(requirements: Vec<CropRequirement>) -> Self {
        Self { requirements }
    }
}

#[async_trait]
impl CropRequirementGateway for InMemoryCropRequirementGateway {
    async fn get_requirements(&self, crop_ids: &[String]) -> RepositoryResult<Vec<CropRequirement>> {
        crop_ids
            .iter()
            .map(|id| {
                self.requirements
                    .iter()
                    .find(|r| r.crop_id() == id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::NotFound {
                        entity: "CropRequirement".to_string(),
                        id: id.clone(),
                    })
            })
            .collect()
    }

    async fn get_all_requirements(&self) -> RepositoryResult<Vec<CropRequirement>> {
        Ok(self.requirements.clone())
    }
}

// ==========================================
// InMemoryWeatherGateway
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryWeatherGateway {
    series: HashMap<String, WeatherSeries>,
    fallback: Option<WeatherSeries>,
}

impl InMemoryWeatherGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有位置共用同一序列
    pub fn uniform(series: WeatherSeries) -> Self {
        Self {
            series: HashMap::new(),
            fallback: Some(series),
        }
    }

    pub fn with_location(mut self, location_key: impl Into<String>, series: WeatherSeries) -> Self {
        self.series.insert(location_key.into(), series);
        self
    }
}

#[async_trait]
impl WeatherGateway for InMemoryWeatherGateway {
    async fn get_weather(
        &self,
        location_key: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<WeatherSeries> {
        self.series
            .get(location_key)
            .or(self.fallback.as_ref())
            .map(|s| s.slice(start, end))
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "WeatherSeries".to_string(),
                id: location_key.to_string(),
            })
    }
}

// ==========================================
// InMemoryInteractionRuleGateway
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryInteractionRuleGateway {
    rules: Vec<InteractionRule>,
}

impl InMemoryInteractionRuleGateway {
    pub fn new(rules: Vec<InteractionRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl InteractionRuleGateway for InMemoryInteractionRuleGateway {
    async fn get_rules(&self) -> RepositoryResult<Vec<InteractionRule>> {
        Ok(self.rules.clone())
    }
}

// ==========================================
// InMemoryOptimizationResultGateway
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryOptimizationResultGateway {
    schedules: RwLock<HashMap<String, OptimizationSchedule>>,
}

impl InMemoryOptimizationResultGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OptimizationResultGateway for InMemoryOptimizationResultGateway {
    async fn save(&self, schedule: &OptimizationSchedule) -> RepositoryResult<()> {
        let mut guard = self.schedules.write().map_err(lock_error)?;
        guard.insert(schedule.schedule_id.clone(), schedule.clone());
        Ok(())
    }

    async fn get(&self, schedule_id: &str) -> RepositoryResult<Option<OptimizationSchedule>> {
        let guard = self.schedules.read().map_err(lock_error)?;
        Ok(guard.get(schedule_id).cloned())
    }

    async fn get_all(&self) -> RepositoryResult<Vec<OptimizationSchedule>> {
        let guard = self.schedules.read().map_err(lock_error)?;
        let mut all: Vec<OptimizationSchedule> = guard.values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.schedule_id.cmp(&b.schedule_id))
        });
        Ok(all)
    }

    async fn delete(&self, schedule_id: &str) -> RepositoryResult<bool> {
        let mut guard = self.schedules.write().map_err(lock_error)?;
        Ok(guard.remove(schedule_id).is_some())
    }

    async fn clear(&self) -> RepositoryResult<usize> {
        let mut guard = self.schedules.write().map_err(lock_error)?;
        let count = guard.len();
        guard.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::OptimizationObjective;
    use crate::domain::weather::WeatherRecord;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    #[tokio::test]
    async fn test_field_gateway_reports_missing_id() {
        let gateway = InMemoryFieldGateway::new(vec![Field::new("F1", "北田", 1000.0, 10.0).unwrap()]);
        let found = gateway.get_fields(&["F1".to_string()]).await.unwrap();
        assert_eq!(found.len(), 1);

        let err = gateway
            .get_fields(&["F1".to_string(), "F9".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { ref id, .. } if id == "F9"));
    }

    #[tokio::test]
    async fn test_weather_gateway_slices_and_falls_back() {
        let series = WeatherSeries::new((1..=10).map(|i| WeatherRecord::with_mean(d(i), 15.0)).collect()).unwrap();
        let gateway = InMemoryWeatherGateway::uniform(series);
        let sliced = gateway.get_weather("anywhere", d(2), d(4)).await.unwrap();
        assert_eq!(sliced.len(), 3);

        let empty = InMemoryWeatherGateway::new();
        assert!(empty.get_weather("tokyo", d(1), d(2)).await.is_err());
    }

    #[tokio::test]
    async fn test_result_gateway_crud() {
        let gateway = InMemoryOptimizationResultGateway::new();
        let schedule =
            OptimizationSchedule::try_new("S1", "plan", OptimizationObjective::MaximizeProfit, vec![], Some(0.0)).unwrap();
        gateway.save(&schedule).await.unwrap();

        assert_eq!(gateway.get("S1").await.unwrap(), Some(schedule));
        assert_eq!(gateway.get_all().await.unwrap().len(), 1);
        assert!(gateway.delete("S1").await.unwrap());
        assert!(!gateway.delete("S1").await.unwrap());
        assert_eq!(gateway.clear().await.unwrap(), 0);
    }
}
