//! 每周生成配额
//!
//! 配额按参考时区（默认 Europe/Paris）的周一 00:00 重置，与本机时区无关。
//! 读存储失败一律当作本周从 0 开始，不阻塞用户。

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::infrastructure::{Clock, KeyValueStore};

/// 本周起点（Unix 毫秒）的存储键
pub const WEEK_START_KEY: &str = "flyer_gen_week_start";
/// 本周已生成次数的存储键
pub const WEEK_COUNT_KEY: &str = "flyer_gen_week_count";

/// 计算 `now` 所在周的周一 00:00（参考时区）
///
/// 在本地日历日期上回退到周一再解析成时刻，夏令时切换不会让边界漂移。
/// 若当地零点因夏令时不存在，取其后的第一个有效时刻。
pub fn week_start_at(now: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    let local_date = now.with_timezone(&tz).date_naive();
    let days_since_monday = u64::from(local_date.weekday().num_days_from_monday());
    let monday = local_date
        .checked_sub_days(Days::new(days_since_monday))
        .unwrap_or(local_date);
    resolve_local(tz, monday.and_time(chrono::NaiveTime::MIN))
}

fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Tz> {
    if let Some(instant) = tz.from_local_datetime(&local).earliest() {
        return instant;
    }
    // 落在夏令时跳变的空档里：向后找第一个存在的时刻
    let mut candidate = local;
    for _ in 0..(24 * 4) {
        candidate += Duration::minutes(15);
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant;
        }
    }
    tz.from_utc_datetime(&local)
}

/// 配额状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    /// 本周起点（Unix 毫秒）
    pub week_start_ms: i64,
    pub count: u32,
}

/// 配额计数器
pub struct QuotaTracker {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    limit: u32,
    state: QuotaState,
}

impl QuotaTracker {
    /// 创建计数器，并立即从存储加载
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, timezone: Tz, limit: u32) -> Self {
        let mut tracker = Self {
            store,
            clock,
            timezone,
            limit,
            state: QuotaState {
                week_start_ms: 0,
                count: 0,
            },
        };
        tracker.load();
        tracker
    }

    /// 按配置创建
    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::new(store, clock, config.quota_timezone, config.max_generations_per_week)
    }

    /// 当前周的周一 00:00
    pub fn current_week_start(&self) -> DateTime<Tz> {
        week_start_at(self.clock.now(), self.timezone)
    }

    /// 从存储加载；若存储的周起点不是本周，则计数归零并写回
    pub fn load(&mut self) -> QuotaState {
        let current = self.current_week_start().timestamp_millis();
        let stored_week = self.read_number(WEEK_START_KEY).unwrap_or(0);

        if stored_week == current {
            let stored_count = self
                .read_number(WEEK_COUNT_KEY)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            self.state = QuotaState {
                week_start_ms: current,
                count: stored_count,
            };
        } else {
            info!("🔄 新的一周，生成配额已重置");
            self.state = QuotaState {
                week_start_ms: current,
                count: 0,
            };
            self.persist();
        }

        self.state
    }

    /// 本周剩余次数
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.state.count)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn state(&self) -> QuotaState {
        self.state
    }

    /// 记一次成功生成
    ///
    /// 计数和周起点一起写入。若自上次加载后已跨周，则计入新的一周。
    pub fn increment(&mut self) -> QuotaState {
        let current = self.current_week_start().timestamp_millis();
        if current != self.state.week_start_ms {
            self.state = QuotaState {
                week_start_ms: current,
                count: 0,
            };
        }
        self.state.count = self.state.count.saturating_add(1);
        self.persist();
        debug!(
            "配额计数 +1: {}/{}",
            self.state.count, self.limit
        );
        self.state
    }

    fn read_number(&self, key: &str) -> Option<i64> {
        match self.store.get(key) {
            Ok(Some(raw)) => match raw.trim().parse::<i64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("⚠️ 配额存储值无法解析 ({} = '{}')，按 0 处理", key, raw);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("⚠️ 读取配额存储失败 ({}): {}，按 0 处理", key, e);
                None
            }
        }
    }

    fn persist(&self) {
        let entries = [
            (WEEK_START_KEY, self.state.week_start_ms.to_string()),
            (WEEK_COUNT_KEY, self.state.count.to_string()),
        ];
        if let Err(e) = self.store.set_many(&entries) {
            warn!("⚠️ 写入配额存储失败: {}", e);
        }
    }
}
