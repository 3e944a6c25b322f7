//! Unified diffs for golden-file mismatches.

use std::fmt::Write as _;

const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op<'a> {
    Keep(&'a str),
    Del(&'a str),
    Add(&'a str),
}

/// Render a unified diff turning `expected` into `actual`, or `None` when the
/// two are equal.
pub fn unified_diff(
    expected: &str,
    actual: &str,
    expected_label: &str,
    actual_label: &str,
) -> Option<String> {
    if expected == actual {
        return None;
    }

    let mut ops: Vec<Op<'_>> = diff::lines(expected, actual)
        .into_iter()
        .map(|r| match r {
            diff::Result::Left(l) => Op::Del(l),
            diff::Result::Both(l, _) => Op::Keep(l),
            diff::Result::Right(r) => Op::Add(r),
        })
        .collect();
    deletions_first(&mut ops);

    let mut out = String::new();
    let _ = writeln!(out, "--- {expected_label}");
    let _ = writeln!(out, "+++ {actual_label}");

    for (start, end) in hunks(&ops) {
        // 1-based line numbers at the start of the hunk on each side.
        let (mut old_line, mut new_line) = (1usize, 1usize);
        for op in &ops[..start] {
            match op {
                Op::Keep(_) => {
                    old_line += 1;
                    new_line += 1;
                }
                Op::Del(_) => old_line += 1,
                Op::Add(_) => new_line += 1,
            }
        }
        let slice = &ops[start..end];
        let old_len = slice.iter().filter(|o| !matches!(o, Op::Add(_))).count();
        let new_len = slice.iter().filter(|o| !matches!(o, Op::Del(_))).count();
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            range(old_line, old_len),
            range(new_line, new_len)
        );
        for op in slice {
            let _ = match op {
                Op::Keep(l) => writeln!(out, " {l}"),
                Op::Del(l) => writeln!(out, "-{l}"),
                Op::Add(l) => writeln!(out, "+{l}"),
            };
        }
    }

    // `lines()` forgets a trailing newline; say so when that is the only difference.
    if expected.ends_with('\n') != actual.ends_with('\n') {
        let side = if expected.ends_with('\n') { actual_label } else { expected_label };
        let _ = writeln!(out, "\\ No newline at end of {side}");
    }

    Some(out)
}

/// Within each run of changed lines, list removals before additions.
fn deletions_first(ops: &mut [Op<'_>]) {
    for run in ops.split_mut(|op| matches!(op, Op::Keep(_))) {
        run.sort_by_key(|op| matches!(op, Op::Add(_)));
    }
}

fn range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start.saturating_sub(1)),
        1 => format!("{start}"),
        _ => format!("{start},{len}"),
    }
}

/// Group changed ops with `CONTEXT` lines around them into half-open ranges.
fn hunks(ops: &[Op<'_>]) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::new();
    for (idx, op) in ops.iter().enumerate() {
        if matches!(op, Op::Keep(_)) {
            continue;
        }
        let start = idx.saturating_sub(CONTEXT);
        let end = (idx + 1 + CONTEXT).min(ops.len());
        match out.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => out.push((start, end)),
        }
    }
    out
}
