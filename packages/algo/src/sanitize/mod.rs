//! 输入清洗
//!
//! Raw caller input (pace, totals, offsets, capacity numbers) is clamped to
//! something the scheduler can always compute with. Every correction is
//! reported as a [`ValidationWarning`]; nothing here fails.

use crate::types::{ReviewOffsets, ValidationWarning, MAX_DISPLAY_DAYS, MAX_SCHEDULE_UNITS};

/// 清理总词数：负数按 0 处理
pub fn sanitize_total_words(raw: i64) -> (u32, Option<ValidationWarning>) {
    if raw < 0 {
        return (
            0,
            Some(ValidationWarning::TotalClamped {
                requested: raw.to_string(),
            }),
        );
    }
    (clamp_to_u32(raw), None)
}

/// 清理总词数 (浮点输入)：NaN / 负数 / 无穷按 0 处理，小数向下取整
pub fn sanitize_total_words_f64(raw: f64) -> (u32, Option<ValidationWarning>) {
    if raw.is_nan() || raw.is_infinite() || raw < 0.0 {
        return (
            0,
            Some(ValidationWarning::TotalClamped {
                requested: raw.to_string(),
            }),
        );
    }
    (clamp_to_u32(raw.floor() as i64), None)
}

/// 清理每日学习量：非正数钳制为 1，避免除零
pub fn sanitize_words_per_day(raw: i64) -> (u32, Option<ValidationWarning>) {
    if raw <= 0 {
        return (
            1,
            Some(ValidationWarning::PaceClamped {
                requested: raw.to_string(),
            }),
        );
    }
    (clamp_to_u32(raw), None)
}

/// 清理每日学习量 (浮点输入)：NaN / 无穷 / 小于 1 钳制为 1，警告保留原始值
pub fn sanitize_words_per_day_f64(raw: f64) -> (u32, Option<ValidationWarning>) {
    if raw.is_nan() || raw.is_infinite() || raw < 1.0 {
        return (
            1,
            Some(ValidationWarning::PaceClamped {
                requested: raw.to_string(),
            }),
        );
    }
    (clamp_to_u32(raw.floor() as i64), None)
}

/// 清理复习间隔序列：非法时回退到默认序列
pub fn sanitize_review_offsets(raw: &[i64]) -> (ReviewOffsets, Option<ValidationWarning>) {
    match ReviewOffsets::new(raw) {
        Ok(offsets) => (offsets, None),
        Err(err) => (
            ReviewOffsets::default(),
            Some(ValidationWarning::InvalidReviewOffsets {
                reason: err.to_string(),
            }),
        ),
    }
}

/// 限制网格单元数，超出上限时截断
pub fn sanitize_unit_count(raw: u32) -> (u32, Option<ValidationWarning>) {
    if raw > MAX_SCHEDULE_UNITS {
        return (
            MAX_SCHEDULE_UNITS,
            Some(ValidationWarning::UnitsClamped {
                requested: raw,
                max: MAX_SCHEDULE_UNITS,
            }),
        );
    }
    (raw, None)
}

/// 限制最小显示天数，超出上限时截断
pub fn sanitize_display_days(raw: Option<u32>) -> (Option<u32>, Option<ValidationWarning>) {
    match raw {
        Some(days) if days > MAX_DISPLAY_DAYS => (
            Some(MAX_DISPLAY_DAYS),
            Some(ValidationWarning::DisplayDaysClamped {
                requested: days,
                max: MAX_DISPLAY_DAYS,
            }),
        ),
        other => (other, None),
    }
}

/// 非负计数 (容量信号等)，负数视为 0
pub fn non_negative(raw: i64) -> u32 {
    clamp_to_u32(raw.max(0))
}

fn clamp_to_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}
