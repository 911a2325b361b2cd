// ==========================================
// 运维工单分析驾驶舱 - 过滤条件快照
// ==========================================
// FilterState 为不可变快照: 每次变更都产生新值
// 所有可选槽位（区域/主管/设施/月份）相互独立，可任意组合
// ==========================================

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::types::BreakdownDimension;

/// 过滤条件错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("日期范围无效: start={start} 晚于 end={end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("月份格式错误（应为YYYY-MM）: {0}")]
    InvalidMonth(String),

    #[error("过滤值不能为空: dimension={0}")]
    EmptyValue(BreakdownDimension),
}

// ==========================================
// YearMonth - 年月分桶
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, FilterError> {
        if !(1..=12).contains(&month) {
            return Err(FilterError::InvalidMonth(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1).and_then(|d| d.pred_opt())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (y, m) = trimmed
            .split_once('-')
            .ok_or_else(|| FilterError::InvalidMonth(trimmed.to_string()))?;
        let year: i32 = y
            .parse()
            .map_err(|_| FilterError::InvalidMonth(trimmed.to_string()))?;
        let month: u32 = m
            .parse()
            .map_err(|_| FilterError::InvalidMonth(trimmed.to_string()))?;
        YearMonth::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = FilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

// ==========================================
// FilterState - 当前查询快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    /// 开始日期（包含）
    pub start_date: NaiveDate,
    /// 结束日期（包含）
    pub end_date: NaiveDate,
    pub area: Option<String>,
    pub supervisor: Option<String>,
    pub installation: Option<String>,
    pub month: Option<YearMonth>,
    /// 仅看滞留工单（超过阈值天数且未终结）
    pub critical_only: bool,
}

impl FilterState {
    /// 以日期范围创建（其余槽位为空）
    pub fn with_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, FilterError> {
        if start_date > end_date {
            return Err(FilterError::InvalidRange {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            start_date,
            end_date,
            area: None,
            supervisor: None,
            installation: None,
            month: None,
            critical_only: false,
        })
    }

    /// 默认过滤条件: 年初至今
    pub fn year_to_date(today: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
        Self {
            start_date: start,
            end_date: today,
            area: None,
            supervisor: None,
            installation: None,
            month: None,
            critical_only: false,
        }
    }

    /// 当前区间的包含天数
    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// 对比上期区间
    ///
    /// 上期结束于 start_date 前一天，向前回溯 (end - start) 天（至少 1 天）。
    /// 例: 2024-01-01..2024-01-31 → 2023-12-02..2023-12-31
    pub fn previous_period(&self) -> (NaiveDate, NaiveDate) {
        let span = (self.end_date - self.start_date).num_days().max(1);
        let prev_end = self.start_date - Duration::days(1);
        let prev_start = self.start_date - Duration::days(span);
        (prev_start, prev_end)
    }

    /// 两个快照的聚合口径是否一致（critical_only 不参与聚合）
    pub fn same_aggregation_scope(&self, other: &FilterState) -> bool {
        self.start_date == other.start_date
            && self.end_date == other.end_date
            && self.area == other.area
            && self.supervisor == other.supervisor
            && self.installation == other.installation
            && self.month == other.month
    }

    /// 仅替换日期范围（其余维度保持不变）
    pub fn shifted_to(&self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            ..self.clone()
        }
    }

    /// 读取某维度槽位的当前值（月份以 YYYY-MM 文本返回）
    pub fn slot(&self, dimension: BreakdownDimension) -> Option<String> {
        match dimension {
            BreakdownDimension::Area => self.area.clone(),
            BreakdownDimension::Supervisor => self.supervisor.clone(),
            BreakdownDimension::Installation => self.installation.clone(),
            BreakdownDimension::Month => self.month.map(|m| m.to_string()),
        }
    }

    /// 以新值替换某个槽位，返回新快照
    pub fn with_slot(
        &self,
        dimension: BreakdownDimension,
        value: Option<&str>,
    ) -> Result<Self, FilterError> {
        // 只拒绝空白值；键原样保存，与分组返回的键逐字一致
        if value.is_some_and(|v| v.trim().is_empty()) {
            return Err(FilterError::EmptyValue(dimension));
        }

        let mut next = self.clone();
        match dimension {
            BreakdownDimension::Area => next.area = value.map(str::to_string),
            BreakdownDimension::Supervisor => next.supervisor = value.map(str::to_string),
            BreakdownDimension::Installation => next.installation = value.map(str::to_string),
            BreakdownDimension::Month => {
                next.month = value.map(|v| YearMonth::from_str(v.trim())).transpose()?;
            }
        }
        Ok(next)
    }

    /// 应用一个过滤动作，返回新快照（自身不变）
    pub fn apply(&self, action: &FilterAction) -> Result<Self, FilterError> {
        match action {
            FilterAction::SetDateRange { start, end } => {
                if start > end {
                    return Err(FilterError::InvalidRange {
                        start: *start,
                        end: *end,
                    });
                }
                Ok(self.shifted_to(*start, *end))
            }
            FilterAction::Select { dimension, key } => self.with_slot(*dimension, Some(key)),
            FilterAction::Clear(dimension) => self.with_slot(*dimension, None),
            FilterAction::SetCriticalOnly(flag) => Ok(Self {
                critical_only: *flag,
                ..self.clone()
            }),
            FilterAction::Reset { today } => Ok(Self::year_to_date(*today)),
        }
    }

    /// 当前生效的过滤项（维度名, 值），用于导出摘要
    pub fn active_filters(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("start_date".to_string(), self.start_date.to_string()),
            ("end_date".to_string(), self.end_date.to_string()),
        ];
        for dim in [
            BreakdownDimension::Area,
            BreakdownDimension::Supervisor,
            BreakdownDimension::Installation,
            BreakdownDimension::Month,
        ] {
            if let Some(v) = self.slot(dim) {
                out.push((dim.to_string(), v));
            }
        }
        if self.critical_only {
            out.push(("critical_only".to_string(), "true".to_string()));
        }
        out
    }
}

/// 过滤动作
///
/// 所有 FilterState 变更都通过该枚举表达，由状态容器统一调度
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterAction {
    SetDateRange { start: NaiveDate, end: NaiveDate },
    /// 选中某维度的原始键（不含展示后缀）
    Select {
        dimension: BreakdownDimension,
        key: String,
    },
    Clear(BreakdownDimension),
    SetCriticalOnly(bool),
    Reset { today: NaiveDate },
}
