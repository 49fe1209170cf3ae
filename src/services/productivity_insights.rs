use crate::models::insights::{ProductivityInsights, ProductivitySnapshot};

const NO_HISTORY_CONTEXT: &str = "No historical data available - first-time user";
const NO_HISTORY_RECOMMENDATION: &str = "Not enough data yet. Start logging study sessions!";

struct Averages {
    hours: f64,
    score: f64,
    burnout: f64,
}

fn averages(history: &[ProductivitySnapshot]) -> Option<Averages> {
    if history.is_empty() {
        return None;
    }
    let count = history.len() as f64;
    let (hours, score, burnout) = history.iter().fold((0.0, 0.0, 0.0), |acc, day| {
        (
            acc.0 + day.hours_studied,
            acc.1 + day.productivity_score,
            acc.2 + day.burnout_risk,
        )
    });
    Some(Averages {
        hours: hours / count,
        score: score / count,
        burnout: burnout / count,
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One-line summary fed into the generator prompt.
pub fn prompt_context(history: &[ProductivitySnapshot]) -> String {
    match averages(history) {
        None => NO_HISTORY_CONTEXT.to_string(),
        Some(avg) => format!(
            "Average {:.1} hours/day, productivity score {:.1}, burnout risk {:.1}",
            avg.hours, avg.score, avg.burnout
        ),
    }
}

pub fn summarize(history: &[ProductivitySnapshot]) -> ProductivityInsights {
    let Some(avg) = averages(history) else {
        return ProductivityInsights {
            average_daily_study_hours: None,
            average_productivity_score: None,
            recommendations: vec![NO_HISTORY_RECOMMENDATION.to_string()],
        };
    };

    let mut recommendations = Vec::new();
    if avg.score < 50.0 {
        recommendations
            .push("Consider scheduling study sessions during your most productive hours.".to_string());
    }
    if avg.hours < 2.0 {
        recommendations.push("Aim for at least 2 hours of focused study per day.".to_string());
    }
    if avg.burnout > 70.0 {
        recommendations
            .push("High burnout risk detected. Consider taking a rest day.".to_string());
    }

    ProductivityInsights {
        average_daily_study_hours: Some(round1(avg.hours)),
        average_productivity_score: Some(round1(avg.score)),
        recommendations,
    }
}
