// ==========================================
// 作物种植排产系统 - 生育期评估引擎
// ==========================================
// 职责: 从候选起始日逐日累加 GDD,推进生育阶段,统计胁迫,计算产量系数
// 输入: 作物阶段需求 + 日气象序列 + 起始日 (+ 计划期终点)
// 输出: 完成日/生育天数/累计积温/产量系数/阶段切换日
// ==========================================
// GDD = max(0, 日均温 − 当前阶段基温)
// 完成日为最后一个生育日的次日（半开区间）
// 阶段完成当日的积温盈余不结转到下一阶段
// ==========================================

use crate::config::{OptimizationConfig, StressRetention, YieldPenaltyPolicy};
use crate::domain::allocation::{GrowthOutcome, StageCrossing, StressSummary};
use crate::domain::crop::{CropRequirement, StageRequirement};
use crate::domain::types::StressKind;
use crate::domain::weather::{WeatherRecord, WeatherSeries};
use crate::engine::error::EvaluationError;
use chrono::{Duration, NaiveDate};

// ==========================================
// GrowthEvaluation - 评估结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthEvaluation {
    pub crop_id: String,
    pub start_date: NaiveDate,
    pub completion_date: NaiveDate,
    pub growth_days: u32,
    pub accumulated_gdd: f64,
    pub yield_factor: f64,
    pub stage_crossings: Vec<StageCrossing>,
    pub stress: StressSummary,
}

impl GrowthEvaluation {
    pub fn outcome(&self) -> GrowthOutcome {
        GrowthOutcome {
            start_date: self.start_date,
            completion_date: self.completion_date,
            accumulated_gdd: self.accumulated_gdd,
            yield_factor: self.yield_factor,
            stress: self.stress,
        }
    }

    /// 产量损失百分比
    pub fn yield_loss_percentage(&self) -> f64 {
        (1.0 - self.yield_factor) * 100.0
    }
}

// ==========================================
// GrowthPeriodEvaluator - 生育期评估引擎
// ==========================================
// 无状态,可跨线程共享
#[derive(Debug, Clone)]
pub struct GrowthPeriodEvaluator {
    policy: YieldPenaltyPolicy,
    retention: StressRetention,
}

impl GrowthPeriodEvaluator {
    pub fn new(policy: YieldPenaltyPolicy, retention: StressRetention) -> Self {
        Self { policy, retention }
    }

    pub fn from_config(config: &OptimizationConfig) -> Self {
        Self::new(config.yield_policy, config.stress_retention.clone())
    }

    /// 评估单个起始日
    ///
    /// # 参数
    /// - requirement: 作物阶段需求
    /// - weather: 日气象序列
    /// - start_date: 候选起始日
    /// - horizon_end: 计划期终点（最后一个生育日不得晚于此日）
    ///
    /// # 错误
    /// - InsufficientWeatherData: 完成前气象数据缺失
    /// - ExceedsHorizon: 计划期内无法完成
    pub fn evaluate(
        &self,
        requirement: &CropRequirement,
        weather: &WeatherSeries,
        start_date: NaiveDate,
        horizon_end: Option<NaiveDate>,
    ) -> Result<GrowthEvaluation, EvaluationError> {
        let crop_id = requirement.crop_id().to_string();
        let stages = &requirement.stages;
        if stages.is_empty() {
            return Err(EvaluationError::NoStages(crop_id));
        }

        let mut day = start_date;
        let mut stage_idx = 0usize;
        let mut stage_gdd = 0.0;
        let mut total_gdd = 0.0;
        let mut stress = StressSummary::default();
        let mut crossings = Vec::with_capacity(stages.len());

        loop {
            if let Some(end) = horizon_end {
                if day > end {
                    return Err(EvaluationError::ExceedsHorizon {
                        crop_id,
                        start_date,
                        horizon_end: end,
                    });
                }
            }

            let record = weather
                .get(day)
                .ok_or_else(|| EvaluationError::InsufficientWeatherData {
                    crop_id: crop_id.clone(),
                    start_date,
                    missing_date: day,
                    accumulated_gdd: total_gdd,
                })?;

            let stage = &stages[stage_idx];
            let daily_gdd = record
                .mean_temperature()
                .map(|t| (t - stage.temperature.base_temperature).max(0.0))
                .unwrap_or(0.0);
            stage_gdd += daily_gdd;
            total_gdd += daily_gdd;
            record_daily_stress(record, stage, &mut stress);

            if stage_gdd >= stage.required_gdd {
                crossings.push(StageCrossing {
                    stage_name: stage.stage_name.clone(),
                    date: day,
                });
                stage_idx += 1;
                stage_gdd = 0.0;
                if stage_idx == stages.len() {
                    break;
                }
            }
            day += Duration::days(1);
        }

        let completion_date = day + Duration::days(1);
        Ok(GrowthEvaluation {
            crop_id,
            start_date,
            completion_date,
            growth_days: (completion_date - start_date).num_days() as u32,
            accumulated_gdd: total_gdd,
            yield_factor: self.yield_factor(&stress),
            stage_crossings: crossings,
            stress,
        })
    }

    /// 按策略组合胁迫日得到产量系数
    pub fn yield_factor(&self, stress: &StressSummary) -> f64 {
        match self.policy {
            YieldPenaltyPolicy::MultiplicativeRetention => StressKind::ALL
                .iter()
                .map(|k| self.retention.retention(*k).powi(stress.days(*k) as i32))
                .product(),
            YieldPenaltyPolicy::WorstCase => StressKind::ALL
                .iter()
                .filter(|k| stress.days(**k) > 0)
                .map(|k| self.retention.retention(*k))
                .fold(1.0, f64::min),
        }
    }
}

/// 单日胁迫判定
///
/// - 霜冻: 日最低温 <= frost_threshold
/// - 低温: 日均温 < low_stress_threshold
/// - 高温: 日最高温 > high_stress_threshold
/// - 不育: 日最高温 >= sterility_risk_threshold
/// - 日照: < minimum 记不足, >= target 记良好
fn record_daily_stress(record: &WeatherRecord, stage: &StageRequirement, stress: &mut StressSummary) {
    let temp = &stage.temperature;
    let mean = record.mean_temperature();
    let t_max = record.temperature_2m_max.or(mean);
    let t_min = record.temperature_2m_min.or(mean);

    if t_min.is_some_and(|t| t <= temp.frost_threshold) {
        stress.record(StressKind::Frost);
    }
    if mean.is_some_and(|t| t < temp.low_stress_threshold) {
        stress.record(StressKind::LowTemp);
    }
    if t_max.is_some_and(|t| t > temp.high_stress_threshold) {
        stress.record(StressKind::HighTemp);
    }
    if let (Some(threshold), Some(t)) = (temp.sterility_risk_threshold, t_max) {
        if t >= threshold {
            stress.record(StressKind::Sterility);
        }
    }
    if let Some(hours) = record.sunshine_hours {
        if hours < stage.sunshine.minimum_sunshine_hours {
            stress.record(StressKind::LowSun);
        } else if hours >= stage.sunshine.target_sunshine_hours {
            stress.good_sun_days += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crop::{Crop, SunshineProfile, TemperatureProfile};

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn requirement(stage_gdds: &[f64]) -> CropRequirement {
        let stages = stage_gdds
            .iter()
            .enumerate()
            .map(|(i, gdd)| StageRequirement {
                stage_name: format!("stage{}", i + 1),
                order: i as u32,
                temperature: TemperatureProfile::with_base(10.0),
                sunshine: SunshineProfile::default(),
                required_gdd: *gdd,
            })
            .collect();
        CropRequirement::new(Crop::new("rice", "水稻"), stages).unwrap()
    }

    fn constant_weather(start: NaiveDate, days: i64, mean: f64) -> WeatherSeries {
        WeatherSeries::new(
            (0..days)
                .map(|i| WeatherRecord::with_mean(start + Duration::days(i), mean))
                .collect(),
        )
        .unwrap()
    }

    fn evaluator() -> GrowthPeriodEvaluator {
        GrowthPeriodEvaluator::new(YieldPenaltyPolicy::MultiplicativeRetention, StressRetention::default())
    }

    // ==========================================
    // 基础功能测试
    // ==========================================

    #[test]
    fn test_constant_weather_completion() {
        // 日均温 20,基温 10 → 每日 10 GDD; 两阶段各 50 → 第 10 天完成
        let weather = constant_weather(date(4, 1), 30, 20.0);
        let eval = evaluator()
            .evaluate(&requirement(&[50.0, 50.0]), &weather, date(4, 1), None)
            .unwrap();

        assert_eq!(eval.completion_date, date(4, 11));
        assert_eq!(eval.growth_days, 10);
        assert_eq!(eval.accumulated_gdd, 100.0);
        assert_eq!(eval.stage_crossings.len(), 2);
        assert_eq!(eval.stage_crossings[0].date, date(4, 5));
        assert_eq!(eval.stage_crossings[1].date, date(4, 10));
        assert_eq!(eval.yield_factor, 1.0);
    }

    #[test]
    fn test_cold_days_contribute_zero_gdd() {
        // 前 5 天低于基温,不积温
        let mut records: Vec<WeatherRecord> = (0..5)
            .map(|i| WeatherRecord::with_mean(date(4, 1) + Duration::days(i), 5.0))
            .collect();
        records.extend((5..30).map(|i| WeatherRecord::with_mean(date(4, 1) + Duration::days(i), 20.0)));
        let weather = WeatherSeries::new(records).unwrap();

        let eval = evaluator()
            .evaluate(&requirement(&[50.0]), &weather, date(4, 1), None)
            .unwrap();
        assert_eq!(eval.growth_days, 10);
        assert_eq!(eval.stress.low_temp_days, 5);
        assert!(eval.yield_factor < 1.0);
    }

    #[test]
    fn test_insufficient_weather_data() {
        let weather = constant_weather(date(4, 1), 3, 20.0);
        let err = evaluator()
            .evaluate(&requirement(&[100.0]), &weather, date(4, 1), None)
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::InsufficientWeatherData { missing_date, .. } if missing_date == date(4, 4)
        ));
    }

    #[test]
    fn test_exceeds_horizon() {
        let weather = constant_weather(date(4, 1), 60, 20.0);
        let err = evaluator()
            .evaluate(&requirement(&[100.0]), &weather, date(4, 1), Some(date(4, 5)))
            .unwrap_err();
        assert!(matches!(err, EvaluationError::ExceedsHorizon { .. }));

        // 最后一个生育日恰好等于终点时可行
        let ok = evaluator()
            .evaluate(&requirement(&[100.0]), &weather, date(4, 1), Some(date(4, 10)))
            .unwrap();
        assert_eq!(ok.completion_date, date(4, 11));
    }

    // ==========================================
    // 产量折减策略测试
    // ==========================================

    #[test]
    fn test_multiplicative_vs_worst_case_yield() {
        let stress = StressSummary {
            frost_days: 2,
            high_temp_days: 1,
            ..StressSummary::default()
        };
        let retention = StressRetention::default();

        let multiplicative = GrowthPeriodEvaluator::new(YieldPenaltyPolicy::MultiplicativeRetention, retention.clone());
        let expected = retention.frost.powi(2) * retention.high_temp;
        assert!((multiplicative.yield_factor(&stress) - expected).abs() < 1e-12);

        let worst = GrowthPeriodEvaluator::new(YieldPenaltyPolicy::WorstCase, retention.clone());
        assert_eq!(worst.yield_factor(&stress), retention.frost.min(retention.high_temp));
        assert_eq!(worst.yield_factor(&StressSummary::default()), 1.0);
    }

    #[test]
    fn test_frost_and_sun_flags() {
        let mut records = Vec::new();
        for i in 0..20 {
            records.push(WeatherRecord {
                date: date(4, 1) + Duration::days(i),
                temperature_2m_max: Some(25.0),
                temperature_2m_min: Some(if i == 0 { -1.0 } else { 15.0 }),
                temperature_2m_mean: Some(20.0),
                precipitation_sum: Some(0.0),
                sunshine_hours: Some(if i < 2 { 8.0 } else { 4.0 }),
            });
        }
        let weather = WeatherSeries::new(records).unwrap();
        let eval = evaluator()
            .evaluate(&requirement(&[50.0]), &weather, date(4, 1), None)
            .unwrap();
        assert_eq!(eval.stress.frost_days, 1);
        assert_eq!(eval.stress.good_sun_days, 2);
        assert_eq!(eval.stress.low_sun_days, 0);
        assert!(eval.yield_loss_percentage() > 0.0);
    }
}
