//! OpenMetrics text rendering.

use std::fmt::Display;
use std::ops::Deref;

use crate::config::config;

/// Metric family.
pub trait OpenMetric: Send + Sync {
    fn name(&self) -> String;

    /// Samples, one per label set.
    fn measurements(&self) -> Vec<Measurement>;

    fn metric_type(&self) -> String {
        "gauge".into()
    }

    fn help(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasurementType {
    Float(f64),
    Integer(u64),
}

impl From<f64> for MeasurementType {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<u64> for MeasurementType {
    fn from(value: u64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for MeasurementType {
    fn from(value: usize) -> Self {
        Self::Integer(value as u64)
    }
}

#[derive(Debug, Clone)]
pub struct Measurement {
    pub labels: Vec<(String, String)>,
    pub measurement: MeasurementType,
}

impl Measurement {
    /// Render sample line, without the trailing newline.
    pub fn render(&self, name: &str) -> String {
        let labels = if self.labels.is_empty() {
            String::new()
        } else {
            let labels = self
                .labels
                .iter()
                .map(|(name, value)| format!("{}=\"{}\"", name, escape(value)))
                .collect::<Vec<_>>();
            format!("{{{}}}", labels.join(","))
        };

        let value = match self.measurement {
            MeasurementType::Float(value) => format!("{:.3}", value),
            MeasurementType::Integer(value) => value.to_string(),
        };

        format!("{}{} {}", name, labels, value)
    }
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Metric family, ready to be rendered.
pub struct Metric {
    metric: Box<dyn OpenMetric>,
}

impl Metric {
    pub fn new(metric: impl OpenMetric + 'static) -> Self {
        Self {
            metric: Box::new(metric),
        }
    }
}

impl Deref for Metric {
    type Target = Box<dyn OpenMetric>;

    fn deref(&self) -> &Self::Target {
        &self.metric
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = config();
        let prefix = config.general.openmetrics_namespace.as_deref().unwrap_or("");
        let name = format!("{}{}", prefix, self.name());

        writeln!(f, "# TYPE {} {}", name, self.metric_type())?;
        if let Some(help) = self.help() {
            writeln!(f, "# HELP {} {}", name, help)?;
        }

        for measurement in self.measurements() {
            writeln!(f, "{}", measurement.render(&name))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::config::{self, Config};

    use super::*;

    struct TestMetric;

    impl OpenMetric for TestMetric {
        fn name(&self) -> String {
            "test".into()
        }

        fn measurements(&self) -> Vec<Measurement> {
            vec![Measurement {
                labels: vec![("plugin".into(), "lib\"router\".so".into())],
                measurement: 5_u64.into(),
            }]
        }

        fn metric_type(&self) -> String {
            "counter".into()
        }

        fn help(&self) -> Option<String> {
            Some("Test metric".into())
        }
    }

    #[test]
    fn test_render() {
        let measurement = Measurement {
            labels: vec![],
            measurement: MeasurementType::Float(0.5),
        };
        assert_eq!(measurement.render("latency"), "latency 0.500");

        let mut cfg = Config::default();
        cfg.general.openmetrics_namespace = Some("router_".into());
        config::set(cfg).unwrap();

        let render = Metric::new(TestMetric {}).to_string();
        config::set(Config::default()).unwrap();

        let lines = render.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "# TYPE router_test counter");
        assert_eq!(lines[1], "# HELP router_test Test metric");
        assert_eq!(lines[2], r#"router_test{plugin="lib\"router\".so"} 5"#);
    }
}
