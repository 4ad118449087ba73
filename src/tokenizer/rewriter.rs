//! 游标式文本改写缓冲区
//!
//! 输出逐段追加；`retract` 只能看到最近一次提交点之后追加的内容，
//! 因此还原时不会误改更早位置出现的同名掩码字面量。

/// 带有限回看区的输出缓冲区
#[derive(Debug, Default)]
pub(crate) struct Rewriter {
    out: String,
    /// 回看区起点，之前的内容不可再修改
    floor: usize,
}

impl Rewriter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            floor: 0,
        }
    }

    /// 追加普通文本 (仍处于回看区内)
    pub(crate) fn emit(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// 追加文本并提交，之后的 `retract` 看不到它及其之前的内容
    pub(crate) fn emit_committed(&mut self, text: &str) {
        self.out.push_str(text);
        self.commit();
    }

    /// 已输出字节数
    pub(crate) fn len(&self) -> usize {
        self.out.len()
    }

    /// 当前回看区内容
    pub(crate) fn lookback(&self) -> &str {
        &self.out[self.floor..]
    }

    /// 回看区以 `literal` 结尾时将其移除并返回 true
    pub(crate) fn retract(&mut self, literal: &str) -> bool {
        if literal.is_empty() || !self.lookback().ends_with(literal) {
            return false;
        }
        let new_len = self.out.len() - literal.len();
        self.out.truncate(new_len);
        true
    }

    pub(crate) fn commit(&mut self) {
        self.floor = self.out.len();
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}
