//! Prometheus text exposition (format version 0.0.4) of collected families.

use super::MetricFamily;
use std::fmt::Write as _;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders `families` in collection order. Families sharing a name are rendered as separate blocks.
pub fn encode_text(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for family in families {
        let name = sanitize_name(&family.name);
        let label_keys: Vec<String> = family.label_keys.iter().map(|k| sanitize_label_name(k)).collect();

        let _ = writeln!(out, "# HELP {name} {}", escape_help(&family.help));
        let _ = writeln!(out, "# TYPE {name} {}", family.metric_type.metric_type_str());

        for sample in &family.samples {
            out.push_str(&name);
            if !label_keys.is_empty() {
                out.push('{');
                for (idx, (key, value)) in label_keys.iter().zip(&sample.label_values).enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{key}=\"{}\"", escape_label_value(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", format_value(sample.value));
        }
    }
    out
}

/// Replaces characters outside `[a-zA-Z0-9_:]` with `_` and guards a leading digit.
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect();
    if sanitized.is_empty() || sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Like [`sanitize_name`] without `:`, which label names may not contain.
pub fn sanitize_label_name(name: &str) -> String {
    sanitize_name(name).replace(':', "_")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let inf = if value > 0.0 { "+Inf" } else { "-Inf" };
        inf.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::metric_up_gauge;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_labeled_family_and_up_gauge() {
        let mut family = MetricFamily::gauge(
            "aliyun_acs_ecs_dashboard_CPUUtilization",
            "",
            vec!["instanceId".to_string(), "name".to_string()],
        );
        family.add_sample(vec!["i-1".to_string(), "web \"a\"".to_string()], 42.5);
        let up = metric_up_gauge("aliyun_acs_ecs_dashboard_CPUUtilization", true);

        assert_eq!(
            encode_text(&[family, up]),
            "# HELP aliyun_acs_ecs_dashboard_CPUUtilization \n\
             # TYPE aliyun_acs_ecs_dashboard_CPUUtilization gauge\n\
             aliyun_acs_ecs_dashboard_CPUUtilization{instanceId=\"i-1\",name=\"web \\\"a\\\"\"} 42.5\n\
             # HELP aliyun_acs_ecs_dashboard_CPUUtilization_up Did the aliyun_acs_ecs_dashboard_CPUUtilization fetch succeed.\n\
             # TYPE aliyun_acs_ecs_dashboard_CPUUtilization_up gauge\n\
             aliyun_acs_ecs_dashboard_CPUUtilization_up 1\n"
        );
    }

    #[test]
    fn sanitizes_invalid_names() {
        assert_eq!(sanitize_name("MySQL_COMDML.Insert"), "MySQL_COMDML_Insert");
        assert_eq!(sanitize_name("1min"), "_1min");
    }

    #[test]
    fn label_names_drop_colons() {
        assert_eq!(sanitize_label_name("aliyun:zone"), "aliyun_zone");
        assert_eq!(sanitize_label_name("1st.key"), "_1st_key");
        assert_eq!(sanitize_name("aliyun:zone"), "aliyun:zone");
    }

    #[test]
    fn renders_sanitized_label_names() {
        let mut family = MetricFamily::gauge("aliyun_meta_ecs_info", "", vec!["zone:id".to_string()]);
        family.add_sample(vec!["cn-hangzhou-h".to_string()], 1.0);

        assert!(encode_text(&[family]).contains("aliyun_meta_ecs_info{zone_id=\"cn-hangzhou-h\"} 1\n"));
    }
}
