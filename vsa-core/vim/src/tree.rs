//! 递归树遍历
//!
//! 快照树与集群组都是"子节点显式、父节点隐式"的结构。遍历按先序进行：
//! 先判定节点本身，再无条件递归其子节点。被忽略的节点仍然会递归，
//! 忽略一个节点不会忽略它的后代。

use serde::Serialize;

/// 树节点
pub trait TreeNode: Sized {
    fn children(&self) -> &[Self];
}

/// 单个节点的判定结果
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<R> {
    /// 选中（执行动作并记录）
    Select(R),
    /// 命中忽略规则，记录但不执行动作
    Ignore(R),
    /// 不参与输出
    Skip,
}

/// 平铺模式的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collected<R> {
    pub selected: Vec<R>,
    pub ignored: Vec<R>,
}

impl<R> Default for Collected<R> {
    fn default() -> Self {
        Self {
            selected: Vec::new(),
            ignored: Vec::new(),
        }
    }
}

impl<R> Collected<R> {
    fn merge(&mut self, other: Collected<R>) {
        self.selected.extend(other.selected);
        self.ignored.extend(other.ignored);
    }
}

/// 平铺遍历
///
/// `visit` 对每个节点按先序调用一次，返回值决定该节点落入哪个列表。
pub fn collect_flat<N, R, F>(nodes: &[N], visit: &mut F) -> Collected<R>
where
    N: TreeNode,
    F: FnMut(&N) -> Verdict<R>,
{
    let mut collected = Collected::default();

    for node in nodes {
        match visit(node) {
            Verdict::Select(record) => collected.selected.push(record),
            Verdict::Ignore(record) => collected.ignored.push(record),
            Verdict::Skip => {}
        }

        collected.merge(collect_flat(node.children(), visit));
    }

    collected
}

/// 嵌套模式的记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeRecord<R> {
    #[serde(flatten)]
    pub record: R,

    /// 是否被选中；被忽略的节点只作为子记录的容器出现
    #[serde(skip)]
    pub selected: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeRecord<R>>,
}

/// 嵌套遍历
///
/// 选中和忽略的节点都产出记录并挂上其子记录；`Skip` 的节点不产出记录，
/// 它的子记录上提到父层。只返回根层记录。
pub fn collect_tree<N, R, F>(nodes: &[N], visit: &mut F) -> Vec<TreeRecord<R>>
where
    N: TreeNode,
    F: FnMut(&N) -> Verdict<R>,
{
    let mut records = Vec::new();

    for node in nodes {
        let verdict = visit(node);
        let children = collect_tree(node.children(), visit);

        match verdict {
            Verdict::Select(record) => records.push(TreeRecord {
                record,
                selected: true,
                children,
            }),
            Verdict::Ignore(record) => records.push(TreeRecord {
                record,
                selected: false,
                children,
            }),
            Verdict::Skip => records.extend(children),
        }
    }

    records
}
