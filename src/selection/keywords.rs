//! Rule table driving category inference and keyword scoring.
//!
//! The table is data, not code: [`ScoringTable::default`] carries the rules used for Japanese
//! government meeting pages, and callers may build their own table with different tokens or
//! weights. The category set itself stays closed.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::types::Category;

/// One condition that can place a document in a category.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-insensitive substring of the display text.
    Title(String),
    /// Regular expression applied to the display text.
    TitlePattern(Regex),
    /// Case-insensitive substring of the file name.
    Filename(String),
}

impl Matcher {
    fn matches(&self, title_lower: &str, filename_lower: &str) -> bool {
        match self {
            Matcher::Title(token) => title_lower.contains(token.as_str()),
            Matcher::TitlePattern(pattern) => pattern.is_match(title_lower),
            Matcher::Filename(token) => filename_lower.contains(token.as_str()),
        }
    }
}

/// Ordered list of matchers for one category.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    /// Category assigned when any matcher fires.
    pub category: Category,
    /// Alternatives; the rule fires when one of them matches.
    pub matchers: Vec<Matcher>,
}

impl CategoryRule {
    fn titles(category: Category, tokens: &[&str]) -> Self {
        Self {
            category,
            matchers: tokens
                .iter()
                .map(|token| Matcher::Title(token.to_lowercase()))
                .collect(),
        }
    }
}

/// Weights and keyword rules used by the scoring engine.
#[derive(Debug, Clone)]
pub struct ScoringTable {
    /// Rules evaluated in order; the first matching rule decides the category.
    pub category_rules: Vec<CategoryRule>,
    /// Base points per category. Missing categories score zero.
    pub base_weights: BTreeMap<Category, i32>,
    /// File-name patterns that mark a primary document.
    pub filename_bonus_patterns: Vec<Regex>,
    /// Points awarded when any file-name pattern matches.
    pub filename_bonus: i32,
    /// Mention-count thresholds and their bonus, highest threshold first.
    pub mention_bonus_steps: Vec<(usize, i32)>,
    /// Penalty for participants, seating, and disclosure notices.
    pub administrative_penalty: i32,
    /// Penalty for reference material when an executive summary exists.
    pub reference_penalty_with_summary: i32,
    /// Penalty for personal material when an executive summary exists.
    pub personal_penalty_with_summary: i32,
}

impl ScoringTable {
    /// Base weight for a category.
    pub fn base_weight(&self, category: Category) -> i32 {
        self.base_weights.get(&category).copied().unwrap_or(0)
    }

    /// Infer a category from display text and file name. First matching rule wins.
    pub fn classify(&self, title: &str, filename: &str) -> Category {
        let title_lower = crate::links::normalize_whitespace(title).to_lowercase();
        let filename_lower = filename.to_lowercase();
        self.category_rules
            .iter()
            .find(|rule| {
                rule.matchers
                    .iter()
                    .any(|matcher| matcher.matches(&title_lower, &filename_lower))
            })
            .map_or(Category::Other, |rule| rule.category)
    }

    /// Bonus for well-known primary-material file names.
    pub fn filename_bonus_for(&self, filename: &str) -> i32 {
        let lower = filename.to_lowercase();
        if self
            .filename_bonus_patterns
            .iter()
            .any(|pattern| pattern.is_match(&lower))
        {
            self.filename_bonus
        } else {
            0
        }
    }

    /// Bonus for a material id mentioned `count` times in the minutes.
    pub fn mention_bonus_for(&self, count: usize) -> i32 {
        self.mention_bonus_steps
            .iter()
            .find(|(threshold, _)| count >= *threshold)
            .map_or(0, |(_, bonus)| *bonus)
    }
}

impl Default for ScoringTable {
    fn default() -> Self {
        let category_rules = vec![
            CategoryRule::titles(Category::Agenda, &["議事次第", "次第", "agenda"]),
            CategoryRule::titles(
                Category::Minutes,
                &["議事録", "議事要旨", "会議録", "議事概要"],
            ),
            CategoryRule::titles(Category::Participants, &["委員名簿", "出席者名簿"]),
            CategoryRule::titles(Category::Seating, &["座席表", "座席配置"]),
            CategoryRule::titles(Category::DisclosureMethod, &["公開方法", "傍聴"]),
            CategoryRule::titles(
                Category::ExecutiveSummary,
                &[
                    "とりまとめ",
                    "取りまとめ",
                    "概要",
                    "executive summary",
                    "エグゼクティブサマリー",
                ],
            ),
            CategoryRule {
                category: Category::Reference,
                matchers: vec![
                    Matcher::Title("参考".into()),
                    Matcher::Filename("sankou".into()),
                ],
            },
            CategoryRule {
                category: Category::Material,
                matchers: vec![
                    Matcher::TitlePattern(MATERIAL_COLON.clone()),
                    Matcher::TitlePattern(MATERIAL_NUMBERED.clone()),
                    Matcher::Title("説明資料".into()),
                    Matcher::Title("事務局資料".into()),
                    Matcher::Title("material".into()),
                ],
            },
            CategoryRule {
                category: Category::Minutes,
                matchers: vec![
                    Matcher::Filename("gijiroku".into()),
                    Matcher::Filename("gijiyoshi".into()),
                    Matcher::Filename("minutes".into()),
                ],
            },
        ];

        let base_weights = BTreeMap::from([
            (Category::ExecutiveSummary, 5),
            (Category::Material, 4),
            (Category::Agenda, 3),
            (Category::Minutes, 3),
            (Category::Reference, 2),
            (Category::PersonalMaterial, 2),
            (Category::Participants, 1),
            (Category::Seating, 1),
            (Category::DisclosureMethod, 1),
            (Category::Other, 0),
        ]);

        Self {
            category_rules,
            base_weights,
            filename_bonus_patterns: FILENAME_BONUS.clone(),
            filename_bonus: 1,
            mention_bonus_steps: vec![(5, 2), (2, 1)],
            administrative_penalty: -10,
            reference_penalty_with_summary: -1,
            personal_penalty_with_summary: -2,
        }
    }
}

static MATERIAL_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^資料\s*[：:]").expect("valid regex"));
static MATERIAL_NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^資料\s*\d+").expect("valid regex"));
static FILENAME_BONUS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"shiryou[01]\.",
        r"shiryou[01]-\d+\.",
        r"honpen\.",
        r"gaiyou\.",
        r"torimatome\.",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});
static MATERIAL_ID_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"資料\s*(\d+(?:-\d+)?)").expect("valid regex"));
static MATERIAL_ID_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:shiryou|material)[_-]?(\d+(?:[-_]\d+)?)").expect("valid regex")
});

/// Replace full-width digits with ASCII digits.
pub(crate) fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Read a material identifier (`資料3-1`) from display text or file name.
pub fn material_id(title: &str, filename: &str) -> Option<String> {
    let title = normalize_digits(title);
    if let Some(captures) = MATERIAL_ID_TEXT.captures(&title) {
        return Some(format!("資料{}", &captures[1]));
    }
    let filename = filename.to_lowercase();
    MATERIAL_ID_FILENAME
        .captures(&filename)
        .map(|captures| format!("資料{}", captures[1].replace('_', "-")))
}

/// Count how often each material identifier is mentioned in minutes text.
pub fn minutes_mentions(minutes_text: &str) -> BTreeMap<String, usize> {
    let text = normalize_digits(minutes_text);
    let mut counts = BTreeMap::new();
    for captures in MATERIAL_ID_TEXT.captures_iter(&text) {
        *counts.entry(format!("資料{}", &captures[1])).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let table = ScoringTable::default();
        assert_eq!(table.classify("議事次第", "shidai.pdf"), Category::Agenda);
        assert_eq!(table.classify("議事概要", "x.pdf"), Category::Minutes);
        assert_eq!(table.classify("報告書概要", "x.pdf"), Category::ExecutiveSummary);
        assert_eq!(table.classify("参考資料1", "x.pdf"), Category::Reference);
        assert_eq!(table.classify("資料2 経済産業省説明資料", "x.pdf"), Category::Material);
        assert_eq!(table.classify("Executive Summary", "x.pdf"), Category::ExecutiveSummary);
    }

    #[test]
    fn filename_tokens_classify_untitled_links() {
        let table = ScoringTable::default();
        assert_eq!(table.classify("", "gijiroku_dai3.pdf"), Category::Minutes);
        assert_eq!(table.classify("", "sankou2.pdf"), Category::Reference);
        assert_eq!(table.classify("", "x.pdf"), Category::Other);
    }

    #[test]
    fn filename_bonus_matches_primary_names() {
        let table = ScoringTable::default();
        assert_eq!(table.filename_bonus_for("Shiryou1.pdf"), 1);
        assert_eq!(table.filename_bonus_for("shiryou0-2.pdf"), 1);
        assert_eq!(table.filename_bonus_for("honpen.pdf"), 1);
        assert_eq!(table.filename_bonus_for("shiryou3.pdf"), 0);
    }

    #[test]
    fn material_ids_come_from_text_then_filename() {
        assert_eq!(material_id("資料 ３-１ 概要", "x.pdf").as_deref(), Some("資料3-1"));
        assert_eq!(material_id("説明", "shiryou_2_1.pdf").as_deref(), Some("資料2-1"));
        assert_eq!(material_id("説明", "x.pdf"), None);
    }

    #[test]
    fn mention_bonus_steps() {
        let table = ScoringTable::default();
        let mentions = minutes_mentions("資料1について。資料１の説明。資料1、資料2");
        assert_eq!(mentions.get("資料1"), Some(&3));
        assert_eq!(table.mention_bonus_for(3), 1);
        assert_eq!(table.mention_bonus_for(5), 2);
        assert_eq!(table.mention_bonus_for(1), 0);
    }
}
