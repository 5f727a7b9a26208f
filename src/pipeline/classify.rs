//! Layout classification of extracted text.
//!
//! Only the first [`CLASSIFY_PAGES`] pages are inspected. Title keywords decide the
//! administrative types; otherwise prose-like and slide-like signals are scored against each
//! other and the winner needs a two-point lead.

use regex::Regex;
use std::sync::LazyLock;

use super::types::DocumentType;
use crate::selection::Category;

/// Number of leading pages used for classification.
pub const CLASSIFY_PAGES: usize = 5;
const SCORE_MARGIN: u32 = 2;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect("valid regex"));
    };
}

pattern!(SENTENCE_END, r"(?m)[。．.!！?？]\s*$");
pattern!(GLYPH_BULLET, r"(?m)^\s*[●・○◯■□◆◇▶▷➢①②③④⑤⑥⑦⑧⑨⑩]\s*");
pattern!(DASH_BULLET, r"(?m)^\s*[-*]\s+");
pattern!(SYMBOL_BULLET, r"(?m)^\s*[^\wぁ-んァ-ン一-龥A-Za-z0-9]{1,2}\s+");
pattern!(
    NOMINAL_ENDING,
    r"(?m)(?:について|に関して|の推進|の強化|の検討|の概要|の方針|の方向性)\s*$"
);
pattern!(PARAGRAPH_BREAK, r"\n\s*\n");
pattern!(PARTICLE, r"[はがをにでと]");
pattern!(POLITE, r"です|ます");
pattern!(PLAIN, r"である|だ。");
pattern!(CITATION, r"によれば|によると|として|示す");
pattern!(REFERENCE_EXPR, r"下図|次の表|以下|上記|図\d|表\d");
pattern!(
    TOPIC_WORD,
    r"議題|資料|方針|概要|案|について|に関して|調査|対策|検討"
);
pattern!(PAGE_NUMBER_LINE, r"(?m)^\s*\d{1,3}\s*$");
pattern!(CLOCK_TIME, r"\b\d{1,2}[:：]\d{2}\b");

/// Counts computed from the leading pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFeatures {
    /// Non-blank lines.
    pub line_count: usize,
    /// Lines ending in sentence punctuation.
    pub sentence_like_count: usize,
    /// Sentence-like lines per line.
    pub sentence_density: f64,
    /// Glyph, dash, and symbol bullets.
    pub bullet_count: usize,
    /// Lines ending in a nominal phrase such as `の推進`.
    pub nominal_ending_count: usize,
    /// Short lines that read like slide topics.
    pub topic_line_count: usize,
    /// Blank-line separated blocks.
    pub paragraph_count: usize,
    /// Case particles.
    pub particle_count: usize,
    /// です/ます endings.
    pub polite_style_count: usize,
    /// である/だ endings.
    pub plain_style_count: usize,
    /// Citation phrases.
    pub citation_count: usize,
    /// References to figures and tables.
    pub reference_expr_count: usize,
    /// Lines holding only a page number.
    pub page_number_line_count: usize,
    /// Share of lines with at most 24 characters.
    pub short_line_ratio: f64,
}

impl TextFeatures {
    /// Measure `text`.
    pub fn measure(text: &str) -> Self {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let joined = lines.join("\n");
        let line_count = lines.len();

        let sentence_like_count = SENTENCE_END.find_iter(&joined).count();
        let bullet_count = GLYPH_BULLET.find_iter(text).count()
            + DASH_BULLET.find_iter(text).count()
            + SYMBOL_BULLET.find_iter(text).count();
        let short_lines = lines.iter().filter(|line| line.chars().count() <= 24).count();
        let topic_line_count = lines
            .iter()
            .filter(|line| line.chars().count() <= 40 && TOPIC_WORD.is_match(line))
            .count();
        let ratio = |count: usize| {
            if line_count == 0 {
                0.0
            } else {
                count as f64 / line_count as f64
            }
        };

        Self {
            line_count,
            sentence_like_count,
            sentence_density: ratio(sentence_like_count),
            bullet_count,
            nominal_ending_count: NOMINAL_ENDING.find_iter(&joined).count(),
            topic_line_count,
            paragraph_count: PARAGRAPH_BREAK
                .split(text)
                .filter(|block| !block.trim().is_empty())
                .count(),
            particle_count: PARTICLE.find_iter(&joined).count(),
            polite_style_count: POLITE.find_iter(&joined).count(),
            plain_style_count: PLAIN.find_iter(&joined).count(),
            citation_count: CITATION.find_iter(&joined).count(),
            reference_expr_count: REFERENCE_EXPR.find_iter(&joined).count(),
            page_number_line_count: PAGE_NUMBER_LINE.find_iter(text).count(),
            short_line_ratio: ratio(short_lines),
        }
    }

    /// Points for paragraph prose.
    pub fn word_score(&self) -> u32 {
        let mut score = self.sentence_like_count.min(8) as u32;
        score += if self.paragraph_count >= 3 { 2 } else { 0 };
        score += if self.particle_count >= 20 { 2 } else { 0 };
        score += u32::from(self.polite_style_count + self.plain_style_count >= 3);
        score += u32::from(self.citation_count >= 2);
        score
    }

    /// Points for slide layout.
    pub fn slide_score(&self) -> u32 {
        let mut score = self.bullet_count.min(8) as u32;
        score += self.nominal_ending_count.min(4) as u32;
        score += if self.short_line_ratio >= 0.45 { 2 } else { 0 };
        score += if self.topic_line_count >= 4 { 2 } else { 0 };
        score += u32::from(self.reference_expr_count >= 2);
        score += if self.page_number_line_count >= 2 { 2 } else { 0 };
        // Dense short lines with few sentences and visible page numbers.
        if self.short_line_ratio >= 0.6
            && self.sentence_density <= 0.2
            && self.page_number_line_count >= 2
        {
            score += 4;
        }
        score
    }
}

/// Classification outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Assigned type.
    pub document_type: DocumentType,
    /// Rule or scores behind the decision.
    pub reason: String,
    /// Measured features.
    pub features: TextFeatures,
}

/// Classify a document from its title, selection category, and leading pages.
pub fn classify(title: &str, category: Category, pages: &[String]) -> Classification {
    let leading = pages
        .iter()
        .take(CLASSIFY_PAGES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    let features = TextFeatures::measure(&leading);
    let title = title.trim();

    let (document_type, reason) = if ["委員名簿", "出席者名簿"].iter().any(|k| title.contains(k))
        || category == Category::Participants
    {
        (DocumentType::Participants, "participant list title".to_string())
    } else if title.contains("次第")
        && (CLOCK_TIME.is_match(&leading) || leading.contains("配布資料"))
    {
        (DocumentType::Agenda, "agenda title with times or materials list".to_string())
    } else if ["プレスリリース", "報道発表"].iter().any(|k| title.contains(k)) {
        (DocumentType::Press, "press release title".to_string())
    } else if ["調査結果", "アンケート"].iter().any(|k| title.contains(k)) {
        (DocumentType::Survey, "survey title".to_string())
    } else if features.line_count == 0 {
        (DocumentType::Other, "no text lines".to_string())
    } else {
        let word = features.word_score();
        let slide = features.slide_score();
        if word >= slide + SCORE_MARGIN {
            (DocumentType::WordLike, format!("word_score={word}, slide_score={slide}"))
        } else if slide >= word + SCORE_MARGIN {
            (
                DocumentType::PowerpointLike,
                format!("slide_score={slide}, word_score={word}"),
            )
        } else {
            (DocumentType::Mixed, format!("close scores word={word}, slide={slide}"))
        }
    };

    Classification {
        document_type,
        reason,
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|text| text.to_string()).collect()
    }

    #[test]
    fn prose_is_word_like() {
        let paragraph = "本報告では、我が国のデジタル政策の現状について整理したものである。\n\
                         各府省の取組を踏まえ、今後の課題を明らかにすることを目的としている。\n\
                         調査によれば、多くの自治体でシステム標準化が進んでいる。\n";
        let text = [paragraph, paragraph, paragraph].join("\n");
        let result = classify("中間報告", Category::Material, &pages(&[&text]));
        assert_eq!(result.document_type, DocumentType::WordLike, "{}", result.reason);
    }

    #[test]
    fn slides_are_powerpoint_like() {
        let slide = "デジタル政策の推進\n● 現状\n● 課題\n● 方向性\n・標準化の検討\n・人材の強化\n3\n";
        let text = [slide, slide, slide].join("\n");
        let result = classify("説明資料", Category::Material, &pages(&[&text]));
        assert_eq!(result.document_type, DocumentType::PowerpointLike, "{}", result.reason);
    }

    #[test]
    fn title_rules_come_first() {
        let text = pages(&["第3回 会議\n10:00 開会\n"]);
        assert_eq!(
            classify("議事次第", Category::Agenda, &text).document_type,
            DocumentType::Agenda
        );
        assert_eq!(
            classify("委員名簿", Category::Participants, &text).document_type,
            DocumentType::Participants
        );
        assert_eq!(
            classify("報道発表資料", Category::Other, &text).document_type,
            DocumentType::Press
        );
    }

    #[test]
    fn agenda_title_without_evidence_falls_through() {
        let text = pages(&["議題について説明する。"]);
        assert_ne!(
            classify("議事次第", Category::Agenda, &text).document_type,
            DocumentType::Agenda
        );
    }

    #[test]
    fn blank_text_is_other() {
        let result = classify("資料", Category::Material, &pages(&["  \n", ""]));
        assert_eq!(result.document_type, DocumentType::Other);
    }

    #[test]
    fn only_leading_pages_are_measured() {
        let mut many = vec!["短い行".to_string(); CLASSIFY_PAGES];
        many.push("これは六ページ目の文章である。".to_string());
        let features = classify("資料", Category::Material, &many).features;
        assert_eq!(features.line_count, CLASSIFY_PAGES);
        assert_eq!(features.sentence_like_count, 0);
    }
}
