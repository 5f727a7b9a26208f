//! Size-adaptive sampling of converted content before summarization.

use super::types::{ContentFormat, ConvertedContent, ReadStrategy, SectionKind, UsedSection};

/// Keywords whose surrounding lines are always worth reading.
pub const HIGH_PRIORITY_KEYWORDS: [&str; 9] = [
    "概要",
    "要旨",
    "サマリー",
    "エグゼクティブ",
    "まとめ",
    "結論",
    "今後の方針",
    "重点",
    "ポイント",
];
/// Keywords read around in medium-sized documents.
pub const MEDIUM_PRIORITY_KEYWORDS: [&str; 5] = ["背景", "目的", "経緯", "課題", "現状"];
/// Keywords marking appendix-like material.
pub const LOW_PRIORITY_KEYWORDS: [&str; 6] = ["参考", "補足", "附属", "詳細データ", "免責", "注記"];

/// Marker inserted where over-budget text was cut.
pub const TRUNCATION_MARKER: &str = "\n\n[...TRUNCATED...]\n\n";

const SLIDE_BUDGET: usize = 18_000;
const SMALL_MAX_LINES: usize = 1_500;
const SMALL_BUDGET: usize = 22_000;
const MEDIUM_MAX_LINES: usize = 6_000;
const MEDIUM_BUDGET: usize = 24_000;
const LARGE_MAX_LINES: usize = 12_000;
const LARGE_BUDGET: usize = 20_000;
const XLARGE_BUDGET: usize = 14_000;
const TAIL_LINES: usize = 120;

/// Excerpt sent to the summarization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedText {
    /// Strategy that produced the excerpt.
    pub strategy: ReadStrategy,
    /// Excerpt text.
    pub text: String,
    /// Line ranges included.
    pub used_sections: Vec<UsedSection>,
}

fn section(kind: SectionKind, line_from: usize, line_to: usize) -> UsedSection {
    UsedSection {
        kind,
        line_from,
        line_to,
    }
}

/// Choose a strategy by content size and build the excerpt.
pub fn prepare(content: &ConvertedContent) -> PreparedText {
    let lines: Vec<&str> = content.text.lines().collect();
    let line_count = lines.len();

    if content.is_blank() {
        return PreparedText {
            strategy: ReadStrategy::Unreadable,
            text: String::new(),
            used_sections: Vec::new(),
        };
    }

    if content.format == ContentFormat::Markdown {
        return PreparedText {
            strategy: ReadStrategy::SlideExcerpt,
            text: trim_chars(&content.text, SLIDE_BUDGET),
            used_sections: vec![section(SectionKind::SlideExcerpt, 1, line_count)],
        };
    }

    if line_count <= SMALL_MAX_LINES {
        return PreparedText {
            strategy: ReadStrategy::FullSmall,
            text: trim_chars(&content.text, SMALL_BUDGET),
            used_sections: vec![section(SectionKind::FullText, 1, line_count)],
        };
    }

    let head_len = if line_count <= MEDIUM_MAX_LINES { 200 } else { 150 };
    let head = &lines[..head_len.min(line_count)];
    let tail: &[&str] = if line_count > TAIL_LINES {
        &lines[line_count - TAIL_LINES..]
    } else {
        &[]
    };
    let mut used_sections = vec![section(SectionKind::Head, 1, head.len())];
    if !tail.is_empty() {
        used_sections.push(section(
            SectionKind::Tail,
            line_count - tail.len() + 1,
            line_count,
        ));
    }

    let hits = |keywords: &[&str]| -> Vec<usize> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| keywords.iter().any(|keyword| line.contains(keyword)))
            .map(|(index, _)| index)
            .collect()
    };
    let high_hits = hits(&HIGH_PRIORITY_KEYWORDS);
    let medium_hits = hits(&MEDIUM_PRIORITY_KEYWORDS);

    let (strategy, budget, windows, window_kind) = if line_count <= MEDIUM_MAX_LINES {
        let anchors: Vec<usize> = high_hits.iter().chain(&medium_hits).copied().collect();
        (
            ReadStrategy::HeadTailKeywords,
            MEDIUM_BUDGET,
            collect_windows(line_count, &anchors, 8, 20),
            SectionKind::KeywordWindow,
        )
    } else {
        let (strategy, budget) = if line_count <= LARGE_MAX_LINES {
            (ReadStrategy::CompressedLarge, LARGE_BUDGET)
        } else {
            (ReadStrategy::CompressedXlarge, XLARGE_BUDGET)
        };
        (
            strategy,
            budget,
            collect_windows(line_count, &high_hits, 6, 14),
            SectionKind::HighPriorityWindow,
        )
    };

    let low_dominant = strategy != ReadStrategy::HeadTailKeywords
        && high_hits.is_empty()
        && hits(&LOW_PRIORITY_KEYWORDS).len() > medium_hits.len();

    let mut chunk: Vec<&str> = head.to_vec();
    if low_dominant {
        used_sections.push(section(SectionKind::LowPriorityDominant, 1, line_count));
    } else {
        for (start, end) in windows {
            used_sections.push(section(window_kind, start + 1, end));
            chunk.push("");
            chunk.extend_from_slice(&lines[start..end]);
        }
    }
    if !tail.is_empty() {
        chunk.push("");
        chunk.extend_from_slice(tail);
    }

    PreparedText {
        strategy,
        text: trim_chars(&chunk.join("\n"), budget),
        used_sections,
    }
}

/// Merge `[hit - before, hit + after]` windows into sorted, non-overlapping half-open ranges.
pub fn collect_windows(
    line_count: usize,
    hits: &[usize],
    before: usize,
    after: usize,
) -> Vec<(usize, usize)> {
    let mut intervals: Vec<(usize, usize)> = hits
        .iter()
        .map(|&hit| (hit.saturating_sub(before), (hit + after + 1).min(line_count)))
        .collect();
    intervals.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some((_, current_end)) if start <= *current_end => {
                *current_end = (*current_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Keep the head and tail halves of over-budget text around [`TRUNCATION_MARKER`].
pub fn trim_chars(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let half = max_chars / 2;
    let head: String = text.chars().take(half).collect();
    let tail: String = text.chars().skip(total - half).collect();
    format!("{head}{TRUNCATION_MARKER}{tail}")
}
