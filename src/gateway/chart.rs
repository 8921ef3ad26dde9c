use serde::Serialize;
use std::fmt;

// Checked in this order; the first category with a matching keyword wins.
const COMPARISON_KEYWORDS: &[&str] = &["por", "cada", "comparar"];
const TREND_KEYWORDS: &[&str] = &["tendência", "evolução", "tempo"];
const DISTRIBUTION_KEYWORDS: &[&str] = &["percentual", "proporção", "distribuição"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSuggestion {
    Comparison,
    Trend,
    Distribution,
    Table,
}

impl ChartSuggestion {
    /// Picks a visualization from keywords in the question. Substring match
    /// on the lower-cased text, so "por" also fires inside longer words.
    pub fn for_intent(intent: &str) -> Self {
        let intent = intent.to_lowercase();
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| intent.contains(k));

        if mentions(COMPARISON_KEYWORDS) {
            ChartSuggestion::Comparison
        } else if mentions(TREND_KEYWORDS) {
            ChartSuggestion::Trend
        } else if mentions(DISTRIBUTION_KEYWORDS) {
            ChartSuggestion::Distribution
        } else {
            ChartSuggestion::Table
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartSuggestion::Comparison => "Gráfico de barras para comparação por categoria",
            ChartSuggestion::Trend => "Gráfico de linhas para tendência temporal",
            ChartSuggestion::Distribution => "Gráfico de pizza para distribuição",
            ChartSuggestion::Table => "Tabela com os resultados",
        }
    }
}

impl fmt::Display for ChartSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
