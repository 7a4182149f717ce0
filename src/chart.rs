use std::path::Path;

use chrono::NaiveDate;
use plotly::common::{Font, Mode, Position, Title};
use plotly::layout::{Axis, AxisType, Layout};
use plotly::{NamedColor, Plot, Scatter};

use crate::config::ChartConfig;
use crate::dates::FORMAT;
use crate::error::{Error, Result};
use crate::metric::{plot_series, MetricConfig};
use crate::region::{total, Region};

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub name: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
    /// Text placed at the last point that has a value.
    pub label: Option<String>,
}

/// Everything a renderer needs: labels plus one trace per plotted region.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub subtitle: String,
    pub y_label: String,
    pub traces: Vec<Trace>,
}

/// Builds the chart described by `config`. Each trace runs from `start` to
/// its own region's latest date; regions with no data since `start` are
/// left out.
pub fn build_chart(tree: &Region, config: &ChartConfig, start: NaiveDate) -> Result<Chart> {
    let region = match &config.region {
        Some(code) => tree
            .find_by_code(code)
            .ok_or_else(|| Error::MissingRegion(code.clone()))?,
        None => tree,
    };
    let metric = &config.metric;

    let plotted: Vec<&Region> = match config.top {
        Some(top) => region.ranked_children(metric).into_iter().take(top).collect(),
        None => vec![region],
    };

    let mut traces = vec![];
    for r in plotted {
        let end = match r.latest_date(metric.series) {
            Some(end) if end >= start => end,
            _ => {
                log::debug!("{}: no {} data since {}", r, metric.series.label(), start);
                continue;
            }
        };
        let points = plot_series(r, start, end, metric)?;
        traces.push(Trace {
            name: r.name().to_string(),
            label: last_label(&points, metric),
            points,
        });
    }

    Ok(Chart {
        title: metric.title(region.name()),
        subtitle: format!("Total: {}", total(region.latest_value(metric.series))),
        y_label: metric.axis_label(),
        traces,
    })
}

/// Whole counts print as integers, derived views with two decimals.
fn last_label(points: &[(NaiveDate, Option<f64>)], metric: &MetricConfig) -> Option<String> {
    let value = points.iter().rev().find_map(|(_, v)| *v)?;
    if metric.change || metric.log || metric.per_capita.is_some() {
        Some(format!("{:.2}", value))
    } else {
        Some(format!("{:.0}", value))
    }
}

/// Writes `chart` as a standalone plotly HTML page. Absent points become
/// gaps in the line.
pub fn render(chart: &Chart, filename: &Path) {
    let font = |size: usize| Font::new().color(NamedColor::Black).size(size).family("Droid Serif");

    let layout = Layout::new()
        .title(Title::new(&format!("{}<br><sub>{}</sub>", chart.title, chart.subtitle)).font(font(24)))
        .x_axis(Axis::new().type_(AxisType::Date).title(Title::new("Date").font(font(12))))
        .y_axis(Axis::new().title(Title::new(&chart.y_label).font(font(12))));

    let mut plot = Plot::new();
    chart.traces.iter().for_each(|trace| {
        let (dates, values): (Vec<String>, Vec<Option<f64>>) = trace
            .points
            .iter()
            .map(|(date, value)| (date.format(FORMAT).to_string(), *value))
            .unzip();
        let last = values.iter().rposition(Option::is_some);
        let texts = (0..values.len())
            .map(|i| match (&trace.label, last) {
                (Some(label), Some(last)) if i == last => label.clone(),
                _ => String::new(),
            })
            .collect::<Vec<String>>();
        plot.add_trace(
            Scatter::new(dates, values)
                .name(&trace.name)
                .mode(Mode::LinesText)
                .text_array(texts)
                .text_position(Position::MiddleRight),
        )
    });
    plot.set_layout(layout);

    plot.to_html(filename);
    log::info!("Wrote {} ({} traces)", filename.display(), chart.traces.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricConfig;
    use crate::region::Series;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tree() -> Region {
        let mut root = Region::root("USA", Some(1000));
        root.update(Series::Cases, ymd(2020, 3, 1), 3);
        root.update(Series::Cases, ymd(2020, 3, 2), 12);
        let ny = root.add_child("36", "New York", Some(100));
        ny.update(Series::Cases, ymd(2020, 3, 1), 2);
        ny.update(Series::Cases, ymd(2020, 3, 2), 10);
        ny.add_child("36061", "New York County", Some(10)).update(Series::Cases, ymd(2020, 3, 2), 4);
        let wa = root.add_child("53", "Washington", Some(50));
        wa.update(Series::Cases, ymd(2020, 3, 1), 1);
        wa.update(Series::Cases, ymd(2020, 3, 2), 2);
        root.add_child("06", "California", Some(400)).update(Series::Cases, ymd(2020, 2, 20), 1);
        root
    }

    fn config(region: Option<&str>, metric: MetricConfig, top: Option<usize>) -> ChartConfig {
        ChartConfig {
            file: "test.html".to_string(),
            region: region.map(str::to_string),
            metric,
            top,
        }
    }

    #[test]
    fn single_region_chart() {
        let chart = build_chart(&tree(), &config(None, MetricConfig::new(Series::Cases), None), ymd(2020, 3, 1)).unwrap();
        assert_eq!(chart.title, "COVID-19 Cases in USA");
        assert_eq!(chart.subtitle, "Total: 12");
        assert_eq!(chart.y_label, "Cumulative Number of Cases");
        assert_eq!(
            chart.traces,
            vec![Trace {
                name: "USA".to_string(),
                points: vec![(ymd(2020, 3, 1), Some(3.0)), (ymd(2020, 3, 2), Some(12.0))],
                label: Some("12".to_string()),
            }]
        );
    }

    #[test]
    fn top_sub_regions_in_rank_order() {
        let metric = MetricConfig::new(Series::Cases).with_per_capita(100.0);
        let chart = build_chart(&tree(), &config(None, metric, Some(2)), ymd(2020, 3, 1)).unwrap();
        let names = chart.traces.iter().map(|t| t.name.as_str()).collect::<Vec<_>>();
        // New York 10/100, Washington 2/50, California 1/400
        assert_eq!(names, vec!["New York", "Washington"]);
        assert_eq!(chart.title, "COVID-19 Cases Per Capita in USA");
    }

    #[test]
    fn stale_regions_are_left_out() {
        let metric = MetricConfig::new(Series::Cases);
        let chart = build_chart(&tree(), &config(None, metric, Some(20)), ymd(2020, 3, 1)).unwrap();
        assert_eq!(chart.traces.len(), 2);
    }

    #[test]
    fn charts_a_region_by_code() {
        let metric = MetricConfig::new(Series::Cases);
        let chart = build_chart(&tree(), &config(Some("36"), metric, Some(5)), ymd(2020, 3, 2)).unwrap();
        assert_eq!(chart.title, "COVID-19 Cases in New York");
        assert_eq!(chart.traces[0].name, "New York County");
        assert_eq!(chart.traces[0].points, vec![(ymd(2020, 3, 2), Some(4.0))]);
    }

    #[test]
    fn missing_total_is_not_zero() {
        let metric = MetricConfig::new(Series::Deaths);
        let chart = build_chart(&tree(), &config(None, metric, None), ymd(2020, 3, 1)).unwrap();
        assert_eq!(chart.subtitle, "Total: -");
        assert!(chart.traces.is_empty());
    }

    #[test]
    fn label_marks_last_valued_point() {
        let mut root = Region::root("USA", Some(1000));
        root.update(Series::Cases, ymd(2020, 3, 1), 5);
        root.update(Series::Cases, ymd(2020, 3, 2), 0);
        let metric = MetricConfig::new(Series::Cases).with_log();
        let chart = build_chart(&root, &config(None, metric, None), ymd(2020, 3, 1)).unwrap();
        // ln(0) is a gap, so the label sits on the 1st
        assert_eq!(chart.traces[0].points[1], (ymd(2020, 3, 2), None));
        assert_eq!(chart.traces[0].label, Some(format!("{:.2}", 5.0_f64.ln())));

        let per_capita = MetricConfig::new(Series::Cases).with_per_capita(100.0);
        let chart = build_chart(&tree(), &config(None, per_capita, Some(1)), ymd(2020, 3, 1)).unwrap();
        assert_eq!(chart.traces[0].label.as_deref(), Some("10.00"));
    }

    #[test]
    fn unknown_region_is_an_error() {
        let metric = MetricConfig::new(Series::Cases);
        assert!(matches!(
            build_chart(&tree(), &config(Some("99"), metric, None), ymd(2020, 3, 1)),
            Err(Error::MissingRegion(code)) if code == "99"
        ));
    }
}
