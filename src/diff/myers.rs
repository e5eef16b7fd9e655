/// Myers shortest edit script over line slices (linear-space middle-snake
/// variant), and grouping of the script into hunks with a context radius.
use std::ops::Range;

/// One step of an edit script, indexed into the old and new line slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edit {
    Equal { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// A run of the edit script covering `old` lines of the old slice and `new`
/// lines of the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Opcode {
    pub tag: OpTag,
    pub old: Range<usize>,
    pub new: Range<usize>,
}

/// Above this many edits per search direction a subproblem is emitted as one
/// block replacement instead of being searched further.
const MAX_SNAKE_SEARCH: usize = 2048;

/// Shortest edit script turning `a` into `b`, in linear space.
///
/// Inside every block of consecutive changes, deletions come before insertions.
/// Regions that differ by more than [`MAX_SNAKE_SEARCH`] edits are not split
/// further, so the script stays valid but may not be minimal there.
pub(crate) fn edit_script<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Edit> {
    let max_d = max_d(a.len(), b.len()).min(MAX_SNAKE_SEARCH + 1);
    let mut vf = Frontier::new(max_d);
    let mut vb = Frontier::new(max_d);
    let mut script = Vec::with_capacity(a.len().max(b.len()));
    conquer(a, 0..a.len(), b, 0..b.len(), &mut vf, &mut vb, &mut script);
    deletions_first(script)
}

fn max_d(n: usize, m: usize) -> usize {
    (n + m).div_ceil(2) + 1
}

/// Furthest reaching x per diagonal `k`, for `k` in `-max_d..max_d`.
struct Frontier {
    offset: isize,
    v: Vec<usize>,
}

impl Frontier {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            v: vec![0; 2 * max_d + 1],
        }
    }

    fn len(&self) -> usize {
        self.v.len()
    }
}

impl std::ops::Index<isize> for Frontier {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.v[(k + self.offset) as usize]
    }
}

impl std::ops::IndexMut<isize> for Frontier {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.v[(k + self.offset) as usize]
    }
}

fn common_prefix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}

/// Trim the common ends of both ranges, then split the rest at the middle
/// snake and recurse on each side.
fn conquer<T: PartialEq>(
    a: &[T],
    mut old: Range<usize>,
    b: &[T],
    mut new: Range<usize>,
    vf: &mut Frontier,
    vb: &mut Frontier,
    script: &mut Vec<Edit>,
) {
    let prefix = common_prefix(&a[old.clone()], &b[new.clone()]);
    script.extend((0..prefix).map(|i| Edit::Equal {
        old: old.start + i,
        new: new.start + i,
    }));
    old.start += prefix;
    new.start += prefix;

    let suffix = common_suffix(&a[old.clone()], &b[new.clone()]);
    old.end -= suffix;
    new.end -= suffix;

    if old.is_empty() {
        script.extend(new.clone().map(|new| Edit::Insert { new }));
    } else if new.is_empty() {
        script.extend(old.clone().map(|old| Edit::Delete { old }));
    } else if let Some((x, y)) = middle_snake(a, old.clone(), b, new.clone(), vf, vb) {
        conquer(a, old.start..x, b, new.start..y, vf, vb, script);
        conquer(a, x..old.end, b, y..new.end, vf, vb, script);
    } else {
        script.extend(old.clone().map(|old| Edit::Delete { old }));
        script.extend(new.clone().map(|new| Edit::Insert { new }));
    }

    script.extend((0..suffix).map(|i| Edit::Equal {
        old: old.end + i,
        new: new.end + i,
    }));
}

/// Point where a forward and a backward greedy search over the same diagonal
/// meet, or `None` when they do not meet within the frontier bounds.
fn middle_snake<T: PartialEq>(
    a: &[T],
    old: Range<usize>,
    b: &[T],
    new: Range<usize>,
    vf: &mut Frontier,
    vb: &mut Frontier,
) -> Option<(usize, usize)> {
    let n = old.len();
    let m = new.len();
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;
    vf[1] = 0;
    vb[1] = 0;

    let d_max = max_d(n, m).min(vf.len() / 2) as isize;
    for d in 0..d_max {
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vf[k - 1] < vf[k + 1]) {
                vf[k + 1]
            } else {
                vf[k - 1] + 1
            };
            let y = (x as isize - k) as usize;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix(&a[old.start + x..old.end], &b[new.start + y..new.end]);
            }
            vf[k] = x;
            if odd && (k - delta).abs() < d && vf[k] + vb[-(k - delta)] >= n {
                return Some((old.start + x0, new.start + y0));
            }
        }

        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vb[k - 1] < vb[k + 1]) {
                vb[k + 1]
            } else {
                vb[k - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let advance = common_suffix(&a[old.start..old.end - x], &b[new.start..new.end - y]);
                x += advance;
                y += advance;
            }
            vb[k] = x;
            if !odd && (k - delta).abs() <= d && vb[k] + vf[-(k - delta)] >= n {
                return Some((old.end - x, new.end - y));
            }
        }
    }
    None
}

fn deletions_first(script: Vec<Edit>) -> Vec<Edit> {
    let mut ordered = Vec::with_capacity(script.len());
    let mut deletes = Vec::new();
    let mut inserts = Vec::new();
    for edit in script {
        match edit {
            Edit::Delete { .. } => deletes.push(edit),
            Edit::Insert { .. } => inserts.push(edit),
            Edit::Equal { .. } => {
                ordered.append(&mut deletes);
                ordered.append(&mut inserts);
                ordered.push(edit);
            }
        }
    }
    ordered.append(&mut deletes);
    ordered.append(&mut inserts);
    ordered
}

/// Collapse an edit script into runs over both slices.
pub(crate) fn opcodes(script: &[Edit]) -> Vec<Opcode> {
    let mut codes = Vec::new();
    let (mut i, mut j) = (0, 0);
    let mut idx = 0;
    while idx < script.len() {
        let (start_i, start_j) = (i, j);
        if matches!(script[idx], Edit::Equal { .. }) {
            while idx < script.len() && matches!(script[idx], Edit::Equal { .. }) {
                i += 1;
                j += 1;
                idx += 1;
            }
            codes.push(Opcode {
                tag: OpTag::Equal,
                old: start_i..i,
                new: start_j..j,
            });
            continue;
        }
        while idx < script.len() && !matches!(script[idx], Edit::Equal { .. }) {
            match script[idx] {
                Edit::Delete { .. } => i += 1,
                Edit::Insert { .. } => j += 1,
                Edit::Equal { .. } => {}
            }
            idx += 1;
        }
        let tag = match (i > start_i, j > start_j) {
            (true, true) => OpTag::Replace,
            (true, false) => OpTag::Delete,
            _ => OpTag::Insert,
        };
        codes.push(Opcode {
            tag,
            old: start_i..i,
            new: start_j..j,
        });
    }
    codes
}

/// Group opcodes into hunks with at most `radius` equal lines of context on
/// each side; equal runs longer than twice the radius separate hunks.
///
/// Identical inputs produce no groups.
pub(crate) fn grouped_opcodes(mut codes: Vec<Opcode>, radius: usize) -> Vec<Vec<Opcode>> {
    if codes.is_empty() {
        codes.push(Opcode {
            tag: OpTag::Equal,
            old: 0..1,
            new: 0..1,
        });
    }
    if let Some(first) = codes.first_mut().filter(|c| c.tag == OpTag::Equal) {
        first.old.start = first.old.start.max(first.old.end.saturating_sub(radius));
        first.new.start = first.new.start.max(first.new.end.saturating_sub(radius));
    }
    if let Some(last) = codes.last_mut().filter(|c| c.tag == OpTag::Equal) {
        last.old.end = last.old.end.min(last.old.start + radius);
        last.new.end = last.new.end.min(last.new.start + radius);
    }

    let mut groups = Vec::new();
    let mut group = Vec::new();
    for mut code in codes {
        if code.tag == OpTag::Equal && code.old.len() > radius.saturating_mul(2) {
            group.push(Opcode {
                tag: OpTag::Equal,
                old: code.old.start..code.old.end.min(code.old.start + radius),
                new: code.new.start..code.new.end.min(code.new.start + radius),
            });
            groups.push(std::mem::take(&mut group));
            code.old.start = code.old.start.max(code.old.end.saturating_sub(radius));
            code.new.start = code.new.start.max(code.new.end.saturating_sub(radius));
        }
        group.push(code);
    }
    if !(group.is_empty() || group.len() == 1 && group[0].tag == OpTag::Equal) {
        groups.push(group);
    }
    groups
}
