use rand::rngs::SmallRng;
use rand::Rng;

/// 所有随机选择的唯一入口，测试可以注入固定种子或固定序列。
pub trait RandomSource {
    /// 返回 `0..len` 内均匀分布的下标。`len` 为 0 或 1 时返回 0。
    fn pick(&mut self, len: usize) -> usize;

    fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            return None;
        }
        items.get(self.pick(items.len()))
    }

    /// Fisher-Yates 洗牌。
    fn shuffle<T>(&mut self, items: &mut [T])
    where
        Self: Sized,
    {
        for i in (1..items.len()).rev() {
            let j = self.pick(i + 1);
            items.swap(i, j);
        }
    }
}

impl RandomSource for SmallRng {
    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.gen_range(0..len)
    }
}

/// 按给定序列循环回放下标，越界时取模。
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    picks: Vec<usize>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(picks: Vec<usize>) -> Self {
        Self { picks, cursor: 0 }
    }

    /// 洗牌时保持原顺序，候选总是取最后一个。
    pub fn identity() -> Self {
        Self::default()
    }
}

impl RandomSource for ScriptedSource {
    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        // 空序列代表恒等洗牌：Fisher-Yates 中每次都选 i 本身。
        if self.picks.is_empty() {
            return len - 1;
        }
        let value = self.picks[self.cursor % self.picks.len()];
        self.cursor += 1;
        value % len
    }
}
