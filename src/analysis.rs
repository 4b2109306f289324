//! Heuristic quality, entity, risk, and relevance scoring.
//!
//! These are deliberately simple fixed-dictionary rules, not an ML model.
//! The dictionaries and constants are part of the behavioral contract with
//! downstream consumers and must not be tuned casually; the real NLP
//! engine runs as a separate service triggered after completion.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{
    EntityKind, ExtractedEntity, IdentifiedRisk, QualityMetrics, RiskAnalysis, RiskLevel,
};

/// Characters of extracted text per page considered "complete".
const CHARS_PER_PAGE: usize = 500;

/// Fixed sub-scores reported when not independently measured.
const DEFAULT_OCR_CONFIDENCE: f64 = 0.85;
const DEFAULT_CLARITY: f64 = 0.80;
const DEFAULT_READABILITY: f64 = 0.75;

/// Fixed per-category match confidences. These are stand-ins; per-match
/// confidence estimation belongs to the downstream NLP engine.
static ENTITY_PATTERNS: Lazy<Vec<(EntityKind, Regex, f64)>> = Lazy::new(|| {
    vec![
        (
            EntityKind::Cnpj,
            Regex::new(r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}").unwrap(),
            0.85,
        ),
        (
            EntityKind::Cpf,
            Regex::new(r"\d{3}\.\d{3}\.\d{3}-\d{2}").unwrap(),
            0.85,
        ),
        (
            EntityKind::Email,
            Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
            0.90,
        ),
        (
            EntityKind::Phone,
            Regex::new(r"\(\d{2}\)\s*\d{4,5}-\d{4}").unwrap(),
            0.80,
        ),
        (
            EntityKind::Currency,
            Regex::new(r"R\$\s*\d{1,3}(?:\.\d{3})*(?:,\d{2})?").unwrap(),
            0.85,
        ),
        (
            EntityKind::Date,
            Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").unwrap(),
            0.80,
        ),
    ]
});

/// Contractual/legal risk terms and their score weights.
const RISK_KEYWORDS: &[(&str, f64)] = &[
    ("multa", 0.3),
    ("penalidade", 0.4),
    ("rescisão", 0.5),
    ("garantia", 0.2),
    ("caução", 0.3),
    ("prazo", 0.1),
    ("inexequível", 0.8),
    ("impugnação", 0.6),
    ("exclusivo", 0.4),
];

/// Procurement domain terms; each match adds to the relevance score.
const RELEVANCE_TERMS: &[&str] = &[
    "licitação",
    "pregão",
    "concorrência",
    "convite",
    "serviços",
    "fornecimento",
    "obras",
    "compras",
];

const RELEVANCE_BASE: f64 = 0.5;
const RELEVANCE_INCREMENT: f64 = 0.1;

/// Compute quality metrics for the final extracted text.
///
/// `text_quality` and `completeness` are `min(1.0, len / (pages * 500))`,
/// defined as 0.0 for a zero-page document. `ocr_confidence` is the
/// measured mean OCR confidence in [0, 1] when OCR ran, else the fixed
/// default. Clarity and readability are fixed constants.
pub fn quality_metrics(
    text: &str,
    page_count: usize,
    ocr_confidence: Option<f64>,
) -> QualityMetrics {
    if page_count == 0 {
        return QualityMetrics::default();
    }

    let text_quality = (text.len() as f64 / (page_count * CHARS_PER_PAGE) as f64).min(1.0);

    QualityMetrics {
        text_quality,
        ocr_confidence: ocr_confidence.unwrap_or(DEFAULT_OCR_CONFIDENCE),
        document_clarity: DEFAULT_CLARITY,
        completeness: text_quality,
        readability: DEFAULT_READABILITY,
    }
}

/// Pattern-match the fixed entity category set against the final text.
///
/// `page_offsets` holds the byte offset where each page's text begins in
/// `text`; it is empty when the text came from OCR, in which case every
/// match is attributed to page 1.
pub fn extract_entities(text: &str, page_offsets: &[usize]) -> Vec<ExtractedEntity> {
    let mut entities = Vec::new();

    for (kind, pattern, confidence) in ENTITY_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            entities.push(ExtractedEntity {
                kind: *kind,
                value: m.as_str().to_string(),
                confidence: *confidence,
                start_pos: m.start(),
                end_pos: m.end(),
                page: page_for_offset(page_offsets, m.start()),
            });
        }
    }

    entities.sort_by_key(|e| e.start_pos);
    entities
}

fn page_for_offset(page_offsets: &[usize], offset: usize) -> usize {
    if page_offsets.is_empty() {
        return 1;
    }
    // partition_point gives the count of pages starting at or before offset.
    page_offsets.partition_point(|&start| start <= offset).max(1)
}

/// Case-insensitive keyword scan producing a clamped risk score and one
/// identified risk per matched term.
pub fn analyze_risks(text: &str) -> RiskAnalysis {
    let lower = text.to_lowercase();
    let mut risks = Vec::new();
    let mut score = 0.0;

    for (keyword, weight) in RISK_KEYWORDS {
        if lower.contains(keyword) {
            score += weight;
            risks.push(IdentifiedRisk {
                category: "contractual".to_string(),
                description: format!("Detected keyword: {}", keyword),
                severity: "medium".to_string(),
                impact: "financial".to_string(),
                confidence: 0.7,
                location: "document".to_string(),
            });
        }
    }

    let score = score.clamp(0.0, 1.0);
    let overall_risk = if score < 0.4 {
        RiskLevel::Low
    } else if score < 0.7 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };

    RiskAnalysis {
        overall_risk,
        risk_score: score,
        identified_risks: risks,
        recommendations: vec![
            "Review contract terms carefully".to_string(),
            "Consult legal team".to_string(),
        ],
        confidence: 0.75,
    }
}

/// Topical-match estimate against the procurement term dictionary,
/// starting from a neutral base and clamped to [0, 1].
pub fn relevance_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score = RELEVANCE_BASE;

    for term in RELEVANCE_TERMS {
        if lower.contains(term) {
            score += RELEVANCE_INCREMENT;
        }
    }

    score.clamp(0.0, 1.0)
}
