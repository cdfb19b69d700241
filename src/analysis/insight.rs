//! Threshold-driven guidance lines derived from session metrics.

use super::stability::SessionMetrics;

/// Map session metrics to an ordered list of guidance strings.
///
/// This is a fixed rule table, not free-form text: the numeric thresholds
/// are part of the output contract. Rules are mutually exclusive within
/// each group, so a rate of five clusters per hour reports "highly
/// unstable" and nothing milder.
pub fn generate_insights(metrics: &SessionMetrics) -> Vec<String> {
    let mut insights = Vec::new();

    let rate = metrics.disruptions_per_hour;
    if rate >= 4.0 {
        insights.push(format!(
            "Connection is highly unstable: {rate:.1} disruption clusters per hour"
        ));
    } else if rate >= 2.0 {
        insights.push(format!(
            "Multiple disruptions per hour ({rate:.1}), intermittent instability"
        ));
    } else if rate > 0.0 {
        insights.push(format!(
            "Low disruption rate ({rate:.2} clusters per hour), outages are infrequent"
        ));
    } else {
        insights.push("No disruption clusters detected in this session".to_string());
    }

    if let Some(stable) = metrics.median_stable_secs {
        if stable < 120.0 {
            insights.push(format!(
                "Stable windows are very short (median {} between disruptions)",
                format_secs(stable)
            ));
        } else if stable < 600.0 {
            insights.push(format!(
                "Median stable window is {}, under 10 minutes between disruptions",
                format_secs(stable)
            ));
        } else {
            insights.push(format!(
                "Longer healthy windows between disruptions (median {})",
                format_secs(stable)
            ));
        }
    }

    if let Some(outage) = metrics.median_disruption_secs {
        if outage >= 10.0 {
            insights.push(format!(
                "Median disruption lasts {outage:.1}s, prolonged dropouts"
            ));
        } else if outage >= 3.0 {
            insights.push(format!(
                "Median disruption lasts {outage:.1}s, noticeable outages"
            ));
        } else {
            insights.push(format!("Disruptions are brief (median {outage:.1}s)"));
        }
    }

    if metrics.span_secs > 0.0 {
        insights.push(format!(
            "Connection was down {:.2}% of the session ({:.1}s of {})",
            metrics.downtime_ratio * 100.0,
            metrics.total_disruption_secs,
            format_secs(metrics.span_secs)
        ));
    }

    if insights.is_empty() {
        insights.push("No significant instability detected".to_string());
    }

    insights
}

/// Render a second count in the shortest readable unit.
pub fn format_secs(secs: f64) -> String {
    if secs < 60.0 {
        return format!("{secs:.1}s");
    }
    let total = secs.round() as i64;
    let mins = total / 60;
    if mins < 60 {
        format!("{}m {:02}s", mins, total % 60)
    } else {
        format!("{}h {:02}m", mins / 60, mins % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> SessionMetrics {
        SessionMetrics {
            sample_count: 0,
            failure_count: 0,
            cluster_count: 0,
            span_secs: 0.0,
            nominal_interval_secs: 1.0,
            median_disruption_secs: None,
            median_stable_secs: None,
            total_disruption_secs: 0.0,
            disruptions_per_hour: 0.0,
            downtime_ratio: 0.0,
        }
    }

    #[test]
    fn test_rate_thresholds_are_mutually_exclusive() {
        let mut m = metrics();
        m.disruptions_per_hour = 5.0;
        let insights = generate_insights(&m);
        assert!(insights.iter().any(|i| i.contains("highly unstable")));
        assert!(!insights.iter().any(|i| i.contains("intermittent")));
        assert!(!insights.iter().any(|i| i.contains("infrequent")));
    }

    #[test]
    fn test_rate_boundaries() {
        let mut m = metrics();
        m.disruptions_per_hour = 4.0;
        assert!(generate_insights(&m)[0].contains("highly unstable"));
        m.disruptions_per_hour = 2.0;
        assert!(generate_insights(&m)[0].contains("intermittent"));
        m.disruptions_per_hour = 0.5;
        assert!(generate_insights(&m)[0].contains("infrequent"));
        m.disruptions_per_hour = 0.0;
        assert!(generate_insights(&m)[0].contains("No disruption clusters"));
    }

    #[test]
    fn test_stable_window_thresholds() {
        let mut m = metrics();
        m.median_stable_secs = Some(45.0);
        assert!(generate_insights(&m).iter().any(|i| i.contains("very short")));
        m.median_stable_secs = Some(300.0);
        assert!(generate_insights(&m).iter().any(|i| i.contains("under 10 minutes")));
        m.median_stable_secs = Some(1800.0);
        assert!(generate_insights(&m).iter().any(|i| i.contains("healthy")));
    }

    #[test]
    fn test_disruption_length_thresholds() {
        let mut m = metrics();
        m.median_disruption_secs = Some(12.0);
        assert!(generate_insights(&m).iter().any(|i| i.contains("prolonged")));
        m.median_disruption_secs = Some(5.0);
        assert!(generate_insights(&m).iter().any(|i| i.contains("noticeable")));
        m.median_disruption_secs = Some(1.0);
        assert!(generate_insights(&m).iter().any(|i| i.contains("brief")));
    }

    #[test]
    fn test_downtime_percentage_requires_positive_span() {
        let mut m = metrics();
        m.span_secs = 3600.0;
        m.total_disruption_secs = 36.0;
        m.downtime_ratio = 0.01;
        let insights = generate_insights(&m);
        assert!(insights.iter().any(|i| i.contains("1.00%")));

        let zero_span = generate_insights(&metrics());
        assert!(!zero_span.iter().any(|i| i.contains('%')));
    }

    #[test]
    fn test_quiet_session_still_reports_something() {
        let insights = generate_insights(&metrics());
        assert!(!insights.is_empty());
    }

    #[test]
    fn test_format_secs_units() {
        assert_eq!(format_secs(45.0), "45.0s");
        assert_eq!(format_secs(0.5), "0.5s");
        assert_eq!(format_secs(130.0), "2m 10s");
        assert_eq!(format_secs(3930.0), "1h 05m");
    }
}
