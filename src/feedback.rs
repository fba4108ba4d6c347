use std::time::Duration;

use rand::Rng;

const GOOD_JOB: &[&str] = &[
    "Great!",
    "You are so awesome",
    "Nice job!",
    "Keep up the great work!",
    "You rock!",
    "Can you spend all this money?",
    "http://giphy.com/gifs/homer-simpson-the-simpsons-season-6-DTywu7YYjWCVW",
];

const OK_BUT_CAN_BE_BETTER: &[&str] = &[
    "Not bad!",
    "Good! Not great, but good!",
    "http://giphy.com/gifs/not-bad-bill-and-ted-JyjWw4ZLdSPE4",
    "http://giphy.com/gifs/season-11-the-simpsons-11x3-l2JdXjyFmZj1Ijb6o",
    "http://giphy.com/gifs/DnAMdo0dZrlm",
];

const YOU_SHOULD_WORK_MORE: &[&str] = &[
    "What's going on? Are you ok?",
    "Next week will be better... probably",
    "Come on, let's go!",
    "I am sure, you can do better than that!",
    "Whatever, I'll do what I want...",
    r"¯\_(ツ)_/¯",
];

/// フィードバックを送るまでの最短の待ち時間。
pub const MIN_DELAY: Duration = Duration::from_secs(1);
/// フィードバックを送るまでの最長の待ち時間。
pub const MAX_DELAY: Duration = Duration::from_secs(3);

/// 年間売上予測に対するフィードバックの分類。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackCategory {
    Good,
    Okay,
    NeedsImprovement,
}

impl FeedbackCategory {
    /// 分類ごとのメッセージ一覧。
    pub fn messages(&self) -> &'static [&'static str] {
        match self {
            FeedbackCategory::Good => GOOD_JOB,
            FeedbackCategory::Okay => OK_BUT_CAN_BE_BETTER,
            FeedbackCategory::NeedsImprovement => YOU_SHOULD_WORK_MORE,
        }
    }
}

/// フィードバックの選択と送信タイミングに使う乱数のtrait。
///
/// テストでは固定値を返す実装に差し替える。
pub trait Chance: Send + Sync {
    /// `0..len`の範囲のインデックスを返す。`len`は1以上。
    fn index(&self, len: usize) -> usize;

    /// `min`以上`max`以下の待ち時間を返す。
    fn delay(&self, min: Duration, max: Duration) -> Duration;
}

/// スレッドローカルな乱数生成器を使う`Chance`。
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomChance;

impl Chance for RandomChance {
    fn index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }

    // 秒単位で待ち時間を選ぶ。
    fn delay(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let secs = rand::thread_rng().gen_range(min.as_secs()..=max.as_secs());
        Duration::from_secs(secs)
    }
}

/// 閾値から年間売上予測を分類し、フィードバックを選ぶ。
///
/// 閾値は千単位の金額で表す。小数も指定できる。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedbackSelector {
    low: f64,
    high: f64,
}

impl FeedbackSelector {
    /// 新しい`FeedbackSelector`を返す。
    ///
    /// # Arguments
    ///
    /// * `low` - これ未満なら`NeedsImprovement`
    /// * `high` - これを超えると`Good`
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// 千単位の年間売上予測を分類する。
    ///
    /// `high`を超える場合を先に判定し、次に`low`以上`high`以下を判定する。
    /// どちらにも当たらない場合は`NeedsImprovement`とするため、`low > high`の設定でも失敗しない。
    pub fn classify(&self, projected_in_thousands: i64) -> FeedbackCategory {
        let projected = projected_in_thousands as f64;
        if projected > self.high {
            FeedbackCategory::Good
        } else if (self.low..=self.high).contains(&projected) {
            FeedbackCategory::Okay
        } else {
            FeedbackCategory::NeedsImprovement
        }
    }

    /// 分類に対応するメッセージを1つ選ぶ。
    pub fn select_message(&self, category: FeedbackCategory, chance: &dyn Chance) -> &'static str {
        let messages = category.messages();
        messages[chance.index(messages.len()) % messages.len()]
    }

    /// 年間売上予測を分類し、メッセージを選ぶ。
    pub fn feedback(&self, projected_in_thousands: i64, chance: &dyn Chance) -> &'static str {
        self.select_message(self.classify(projected_in_thousands), chance)
    }
}
