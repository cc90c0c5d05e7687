// ==========================================
// 作物种植排产系统 - JSON 文件网关
// ==========================================
// 格式: 每个文件是一个 JSON 数组（Field / CropRequirement / InteractionRule）
// 加载: 每次调用重新读取文件,反序列化后逐条显式校验
// ==========================================

use crate::domain::crop::CropRequirement;
use crate::domain::field::Field;
use crate::domain::interaction::InteractionRule;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::{CropRequirementGateway, FieldGateway, InteractionRuleGateway};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 读取 JSON 数组文件
async fn read_json_array<T: DeserializeOwned>(path: &Path) -> RepositoryResult<Vec<T>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RepositoryError::IoError(format!("{}: {}", path.display(), e)))?;
    let items: Vec<T> = serde_json::from_str(&raw)?;
    debug!(path = %path.display(), count = items.len(), "JSON 文件加载完成");
    Ok(items)
}

/// 按ID挑选,保持调用方顺序
fn pick_by_id<T: Clone>(
    items: &[T],
    ids: &[String],
    entity: &str,
    id_of: impl Fn(&T) -> &str,
) -> RepositoryResult<Vec<T>> {
    ids.iter()
        .map(|id| {
            items
                .iter()
                .find(|item| id_of(item) == id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound {
                    entity: entity.to_string(),
                    id: id.clone(),
                })
        })
        .collect()
}

// ==========================================
// JsonFileFieldGateway
// ==========================================
pub struct JsonFileFieldGateway {
    path: PathBuf,
}

impl JsonFileFieldGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FieldGateway for JsonFileFieldGateway {
    async fn get_fields(&self, field_ids: &[String]) -> RepositoryResult<Vec<Field>> {
        let all = self.get_all_fields().await?;
        pick_by_id(&all, field_ids, "Field", |f| &f.field_id)
    }

    async fn get_all_fields(&self) -> RepositoryResult<Vec<Field>> {
        let fields: Vec<Field> = read_json_array(&self.path).await?;
        for field in &fields {
            field.validate()?;
        }
        Ok(fields)
    }
}

// ==========================================
// JsonFileCropRequirementGateway
// ==========================================
pub struct JsonFileCropRequirementGateway {
    path: PathBuf,
}

impl JsonFileCropRequirementGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CropRequirementGateway for JsonFileCropRequirementGateway {
    async fn get_requirements(&self, crop_ids: &[String]) -> RepositoryResult<Vec<CropRequirement>> {
        let all = self.get_all_requirements().await?;
        pick_by_id(&all, crop_ids, "CropRequirement", |r| r.crop_id())
    }

    async fn get_all_requirements(&self) -> RepositoryResult<Vec<CropRequirement>> {
        let raw: Vec<CropRequirement> = read_json_array(&self.path).await?;
        // 经构造函数重建以保证阶段有序
        raw.into_iter()
            .map(|r| CropRequirement::new(r.crop, r.stages).map_err(RepositoryError::from))
            .collect()
    }
}

// ==========================================
// JsonFileInteractionRuleGateway
// ==========================================
pub struct JsonFileInteractionRuleGateway {
    path: PathBuf,
}

impl JsonFileInteractionRuleGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InteractionRuleGateway for JsonFileInteractionRuleGateway {
    async fn get_rules(&self) -> RepositoryResult<Vec<InteractionRule>> {
        let rules: Vec<InteractionRule> = read_json_array(&self.path).await?;
        for rule in &rules {
            rule.validate()?;
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_fields_loaded_and_validated() {
        let file = write_temp(
            r#"[{"field_id":"F1","name":"北田","area":1000.0,"daily_fixed_cost":50.0,"location":"tokyo"},
                {"field_id":"F2","name":"南田","area":500.0,"daily_fixed_cost":20.0}]"#,
        );
        let gateway = JsonFileFieldGateway::new(file.path());
        let fields = gateway.get_fields(&["F2".to_string(), "F1".to_string()]).await.unwrap();
        assert_eq!(fields[0].field_id, "F2");
        assert_eq!(fields[1].weather_key(), "tokyo");

        let bad = write_temp(r#"[{"field_id":"F1","name":"北田","area":0.0,"daily_fixed_cost":50.0}]"#);
        let err = JsonFileFieldGateway::new(bad.path()).get_all_fields().await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_requirement_stages_sorted_on_load() {
        let file = write_temp(
            r#"[{"crop":{"crop_id":"rice","name":"水稻"},
                 "stages":[
                   {"stage_name":"ripening","order":2,"required_gdd":300.0,
                    "temperature":{"base_temperature":10.0,"optimal_min":20.0,"optimal_max":30.0,
                                   "low_stress_threshold":12.0,"high_stress_threshold":35.0,"frost_threshold":0.0}},
                   {"stage_name":"germination","order":1,"required_gdd":100.0,
                    "temperature":{"base_temperature":10.0,"optimal_min":20.0,"optimal_max":30.0,
                                   "low_stress_threshold":12.0,"high_stress_threshold":35.0,"frost_threshold":0.0}}
                 ]}]"#,
        );
        let gateway = JsonFileCropRequirementGateway::new(file.path());
        let reqs = gateway.get_requirements(&["rice".to_string()]).await.unwrap();
        assert_eq!(reqs[0].stages[0].stage_name, "germination");

        let err = gateway.get_requirements(&["wheat".to_string()]).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rules_out_of_range_rejected() {
        let file = write_temp(
            r#"[{"rule_id":"R1","rule_type":"continuous_cultivation","source_group":"a","target_group":"a","impact_ratio":1.5}]"#,
        );
        let err = JsonFileInteractionRuleGateway::new(file.path()).get_rules().await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = JsonFileInteractionRuleGateway::new("/nonexistent/rules.json")
            .get_rules()
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::IoError(_)));
    }
}
