//! Report Renderer - presentation of a `RiskAssessment`
//!
//! A pure consumer of the assessment. Every presentation variant (labels in
//! one or two languages) goes through the same renderer; none of them
//! recomputes anything.

use serde::{Deserialize, Serialize};

use crate::scoring::RiskAssessment;

/// Cells in the text progress bar
pub const PROGRESS_BAR_WIDTH: usize = 20;

/// Label language of the rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLocale {
    #[default]
    English,
    /// English followed by Chinese
    Bilingual,
}

impl std::str::FromStr for ReportLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(ReportLocale::English),
            "bilingual" | "en-zh" | "zh" => Ok(ReportLocale::Bilingual),
            other => Err(format!("unknown report locale `{}`", other)),
        }
    }
}

/// Binary verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    pub fn from_assessment(assessment: &RiskAssessment) -> Self {
        if assessment.is_high_risk {
            RiskLevel::High
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Everything a front end needs to show one result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub level: RiskLevel,
    pub raw_label: String,
    /// Raw probability as a percentage, two decimals
    pub raw_percent: String,
    /// Shown next to the raw probability only when it exceeds the threshold
    pub threshold_delta: Option<String>,
    pub score_label: String,
    /// Display probability as a percentage, one decimal
    pub score_percent: String,
    /// Progress value in [0, 1]
    pub progress: f64,
    pub progress_bar: String,
    pub title: String,
    pub message: String,
    pub recommendation: String,
    pub technical_note: String,
}

struct Labels {
    raw: &'static str,
    score: &'static str,
    high_title: &'static str,
    high_message: &'static str,
    high_recommendation: &'static str,
    low_title: &'static str,
    low_message: &'static str,
    low_recommendation: &'static str,
}

const ENGLISH: Labels = Labels {
    raw: "Raw Probability (Model)",
    score: "Clinical Risk Score",
    high_title: "High Risk Detected",
    high_message: "The patient shows a high probability of hypoalbuminemia.",
    high_recommendation: "Clinical nutritional intervention is suggested.",
    low_title: "Low Risk",
    low_message: "The probability of hypoalbuminemia is low.",
    low_recommendation: "Routine monitoring.",
};

const BILINGUAL: Labels = Labels {
    raw: "Raw Probability (Model) / 模型原始概率",
    score: "Clinical Risk Score / 临床风险评分",
    high_title: "High Risk Detected / 高风险",
    high_message: "The patient shows a high probability of hypoalbuminemia. / 患者发生低白蛋白血症的概率较高。",
    high_recommendation: "Clinical nutritional intervention is suggested. / 建议进行临床营养干预。",
    low_title: "Low Risk / 低风险",
    low_message: "The probability of hypoalbuminemia is low. / 患者发生低白蛋白血症的概率较低。",
    low_recommendation: "Routine monitoring. / 常规监测。",
};

impl RiskReport {
    pub fn render(assessment: &RiskAssessment, locale: ReportLocale) -> Self {
        let labels = match locale {
            ReportLocale::English => &ENGLISH,
            ReportLocale::Bilingual => &BILINGUAL,
        };
        let level = RiskLevel::from_assessment(assessment);
        let (title, message, recommendation) = match level {
            RiskLevel::High => (labels.high_title, labels.high_message, labels.high_recommendation),
            RiskLevel::Low => (labels.low_title, labels.low_message, labels.low_recommendation),
        };

        let threshold = assessment.threshold;
        let progress = assessment.display_probability.clamp(0.0, 1.0);

        Self {
            level,
            raw_label: labels.raw.to_string(),
            raw_percent: percent(assessment.raw_probability, 2),
            threshold_delta: (assessment.raw_probability > threshold)
                .then(|| format!("> {} Threshold", percent(threshold, 2))),
            score_label: labels.score.to_string(),
            score_percent: percent(assessment.display_probability, 1),
            progress,
            progress_bar: progress_bar(progress, PROGRESS_BAR_WIDTH),
            title: title.to_string(),
            message: message.to_string(),
            recommendation: recommendation.to_string(),
            technical_note: format!(
                "Risk Score >50% aligns with Raw Probability > {} (Youden Index).",
                threshold
            ),
        }
    }
}

impl std::fmt::Display for RiskReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.raw_label, self.raw_percent)?;
        if let Some(delta) = &self.threshold_delta {
            write!(f, " ({})", delta)?;
        }
        writeln!(f)?;
        writeln!(f, "{}: {}", self.score_label, self.score_percent)?;
        writeln!(f, "{}", self.progress_bar)?;
        writeln!(f, "[{}] {}", self.level, self.title)?;
        writeln!(f, "{}", self.message)?;
        writeln!(f, "Recommendation: {}", self.recommendation)?;
        write!(f, "{}", self.technical_note)
    }
}

/// `0.3396` with two decimals -> `"33.96%"`
pub fn percent(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value * 100.0)
}

/// Text bar with `width` cells, filled in proportion to `fraction`
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(raw: f64, display: f64, high: bool) -> RiskAssessment {
        RiskAssessment {
            raw_probability: raw,
            display_probability: display,
            is_high_risk: high,
            threshold: 0.3396,
        }
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(percent(0.3396, 2), "33.96%");
        assert_eq!(percent(0.5, 1), "50.0%");
        assert_eq!(percent(1.0, 1), "100.0%");
        assert_eq!(percent(0.0, 2), "0.00%");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "[----]");
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(1.0, 4), "[####]");
        assert_eq!(progress_bar(1.7, 4), "[####]");
    }

    #[test]
    fn test_low_risk_report() {
        let report = RiskReport::render(&assessment(0.3396, 0.5, false), ReportLocale::English);
        assert_eq!(report.level, RiskLevel::Low);
        assert_eq!(report.raw_percent, "33.96%");
        assert_eq!(report.score_percent, "50.0%");
        assert_eq!(report.threshold_delta, None);
        assert_eq!(report.recommendation, "Routine monitoring.");
        assert!(report.technical_note.contains("0.3396"));
    }

    #[test]
    fn test_high_risk_report() {
        let report = RiskReport::render(&assessment(0.6698, 0.75, true), ReportLocale::English);
        assert_eq!(report.level, RiskLevel::High);
        assert_eq!(report.score_percent, "75.0%");
        assert_eq!(report.threshold_delta.as_deref(), Some("> 33.96% Threshold"));
        assert!(report.recommendation.contains("nutritional intervention"));
        assert_eq!(report.progress_bar, "[###############-----]");
    }

    #[test]
    fn test_bilingual_labels() {
        let report = RiskReport::render(&assessment(0.1, 0.147, false), ReportLocale::Bilingual);
        assert!(report.title.starts_with("Low Risk / "));
        assert!(report.recommendation.contains("常规监测"));
        assert_eq!(report.raw_percent, "10.00%");
    }

    #[test]
    fn test_plain_text_card() {
        let report = RiskReport::render(&assessment(0.6698, 0.75, true), ReportLocale::English);
        let text = report.to_string();
        assert!(text.contains("Raw Probability (Model): 66.98% (> 33.96% Threshold)"));
        assert!(text.contains("[HIGH] High Risk Detected"));
    }

    #[test]
    fn test_locale_from_str() {
        assert_eq!("EN".parse::<ReportLocale>(), Ok(ReportLocale::English));
        assert_eq!("bilingual".parse::<ReportLocale>(), Ok(ReportLocale::Bilingual));
        assert!("fr".parse::<ReportLocale>().is_err());
    }
}
