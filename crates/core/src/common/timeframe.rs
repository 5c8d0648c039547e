use crate::common::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// # Summary
/// 周期的基础时间单位。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeframeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl TimeframeUnit {
    /// 周期短名称中使用的单位后缀。分钟与月份仅靠大小写区分。
    pub fn code(self) -> char {
        match self {
            TimeframeUnit::Minute => 'm',
            TimeframeUnit::Hour => 'h',
            TimeframeUnit::Day => 'd',
            TimeframeUnit::Week => 'w',
            TimeframeUnit::Month => 'M',
        }
    }

    fn from_code(code: char) -> Option<Self> {
        match code {
            'm' => Some(TimeframeUnit::Minute),
            'h' => Some(TimeframeUnit::Hour),
            'd' => Some(TimeframeUnit::Day),
            'w' => Some(TimeframeUnit::Week),
            'M' => Some(TimeframeUnit::Month),
            _ => None,
        }
    }
}

/// # Summary
/// K 线采样周期，由数量与单位组成 (例如 4 小时、1 个月)。
///
/// # Invariants
/// - Minute: 1..=59；Hour: 1..=23；Day / Week: 仅 1；Month: 1, 2, 3, 6, 12。
/// - 只能通过 `Timeframe::new` 或预设常量构造，因此任何实例都是合法的。
/// - 不同的 (amount, unit) 组合对应不同的短名称。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    amount: u32,
    unit: TimeframeUnit,
}

impl Timeframe {
    pub const ONE_MINUTE: Timeframe = Timeframe::preset(1, TimeframeUnit::Minute);
    pub const FIVE_MINUTES: Timeframe = Timeframe::preset(5, TimeframeUnit::Minute);
    pub const FIFTEEN_MINUTES: Timeframe = Timeframe::preset(15, TimeframeUnit::Minute);
    pub const THIRTY_MINUTES: Timeframe = Timeframe::preset(30, TimeframeUnit::Minute);
    pub const ONE_HOUR: Timeframe = Timeframe::preset(1, TimeframeUnit::Hour);
    pub const TWO_HOURS: Timeframe = Timeframe::preset(2, TimeframeUnit::Hour);
    pub const FOUR_HOURS: Timeframe = Timeframe::preset(4, TimeframeUnit::Hour);
    pub const ONE_DAY: Timeframe = Timeframe::preset(1, TimeframeUnit::Day);
    pub const ONE_WEEK: Timeframe = Timeframe::preset(1, TimeframeUnit::Week);
    pub const ONE_MONTH: Timeframe = Timeframe::preset(1, TimeframeUnit::Month);

    // 仅供上面的常量使用，常量值均满足不变量
    const fn preset(amount: u32, unit: TimeframeUnit) -> Self {
        Self { amount, unit }
    }

    /// # Summary
    /// 构造并校验一个周期。
    ///
    /// # Logic
    /// 1. 数量必须为正整数。
    /// 2. 按单位检查数量上限或允许取值集合。
    ///
    /// # Arguments
    /// * `amount`: 单位的倍数。
    /// * `unit`: 基础时间单位。
    ///
    /// # Returns
    /// 合法时返回周期，否则返回 `ValidationError::Timeframe`。
    pub fn new(amount: u32, unit: TimeframeUnit) -> Result<Self, ValidationError> {
        let reject = |reason| ValidationError::Timeframe {
            amount,
            unit,
            reason,
        };

        if amount == 0 {
            return Err(reject("amount must be a positive integer"));
        }

        match unit {
            TimeframeUnit::Minute if amount > 59 => {
                Err(reject("minute units can only be used with amounts between 1-59"))
            }
            TimeframeUnit::Hour if amount > 23 => {
                Err(reject("hour units can only be used with amounts between 1-23"))
            }
            TimeframeUnit::Day | TimeframeUnit::Week if amount != 1 => {
                Err(reject("day and week units can only be used with amount 1"))
            }
            TimeframeUnit::Month if !matches!(amount, 1 | 2 | 3 | 6 | 12) => Err(reject(
                "month units can only be used with amounts 1, 2, 3, 6 and 12",
            )),
            _ => Ok(Self { amount, unit }),
        }
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn unit(&self) -> TimeframeUnit {
        self.unit
    }

    /// 短名称，例如 `"4h"`、`"1M"`。
    pub fn canonical_name(&self) -> String {
        format!("{}{}", self.amount, self.unit.code())
    }

    /// 全部预设周期，按短名称索引。
    pub fn presets() -> &'static BTreeMap<String, Timeframe> {
        &PRESETS
    }

    /// 按短名称查找预设周期。
    pub fn preset_by_name(name: &str) -> Option<Timeframe> {
        PRESETS.get(name).copied()
    }
}

static PRESETS: LazyLock<BTreeMap<String, Timeframe>> = LazyLock::new(|| {
    [
        Timeframe::ONE_MINUTE,
        Timeframe::FIVE_MINUTES,
        Timeframe::FIFTEEN_MINUTES,
        Timeframe::THIRTY_MINUTES,
        Timeframe::ONE_HOUR,
        Timeframe::TWO_HOURS,
        Timeframe::FOUR_HOURS,
        Timeframe::ONE_DAY,
        Timeframe::ONE_WEEK,
        Timeframe::ONE_MONTH,
    ]
    .into_iter()
    .map(|tf| (tf.canonical_name(), tf))
    .collect()
});

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.code())
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unknown = || ValidationError::UnknownTimeframe(s.to_string());

        let code = trimmed.chars().last().ok_or_else(unknown)?;
        let unit = TimeframeUnit::from_code(code).ok_or_else(unknown)?;
        let digits = &trimmed[..trimmed.len() - code.len_utf8()];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }
        let amount = digits.parse::<u32>().map_err(|_| unknown())?;

        Timeframe::new(amount, unit)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.canonical_name()
    }
}
