//! Aggregation descriptors.
//!
//! Aggregations form a closed family of bucket, metric and pipeline variants.
//! Every variant owns a map of named sub-aggregations and an open parameter
//! bag that compilers copy into the emitted object.

use crate::error::ParseError;
use crate::ir::clause::Clause;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Named aggregation set, ordered by name
pub type Aggregations = BTreeMap<String, Aggregation>;

/// Sub-aggregations and extra parameters shared by every variant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregationCommon {
    nested: Aggregations,
    params: Map<String, Value>,
}

// ============================================================================
// Type tags
// ============================================================================

/// Discriminator for [`Aggregation`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    Terms,
    Metric,
    Percentiles,
    DateHistogram,
    DateRange,
    Filter,
    Pipeline,
}

/// Single-value metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Avg,
    Sum,
    Min,
    Max,
    Count,
    Cardinality,
    Median,
    TopHits,
}

impl MetricType {
    pub const ALL: [MetricType; 8] = [
        MetricType::Avg,
        MetricType::Sum,
        MetricType::Min,
        MetricType::Max,
        MetricType::Count,
        MetricType::Cardinality,
        MetricType::Median,
        MetricType::TopHits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Avg => "avg",
            MetricType::Sum => "sum",
            MetricType::Min => "min",
            MetricType::Max => "max",
            MetricType::Count => "count",
            MetricType::Cardinality => "cardinality",
            MetricType::Median => "median",
            MetricType::TopHits => "top_hits",
        }
    }
}

impl FromStr for MetricType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricType::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| ParseError::UnknownMetric { tag: s.to_string() })
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline aggregation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineType {
    Derivative,
    CumulativeSum,
    AvgBucket,
    SumBucket,
    MaxBucket,
    MinBucket,
    BucketScript,
}

impl PipelineType {
    pub const ALL: [PipelineType; 7] = [
        PipelineType::Derivative,
        PipelineType::CumulativeSum,
        PipelineType::AvgBucket,
        PipelineType::SumBucket,
        PipelineType::MaxBucket,
        PipelineType::MinBucket,
        PipelineType::BucketScript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineType::Derivative => "derivative",
            PipelineType::CumulativeSum => "cumulative_sum",
            PipelineType::AvgBucket => "avg_bucket",
            PipelineType::SumBucket => "sum_bucket",
            PipelineType::MaxBucket => "max_bucket",
            PipelineType::MinBucket => "min_bucket",
            PipelineType::BucketScript => "bucket_script",
        }
    }
}

impl FromStr for PipelineType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineType::ALL
            .into_iter()
            .find(|pipeline| pipeline.as_str() == s)
            .ok_or_else(|| ParseError::UnknownPipeline { tag: s.to_string() })
    }
}

/// How a date histogram interval is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    /// Calendar-aware units (`1M`, `1q`, `1y`)
    Calendar,
    /// Fixed SI durations (`90m`, `12h`)
    Fixed,
    /// Pre-7.x `interval` key
    #[default]
    Legacy,
}

impl IntervalKind {
    /// Key used in the emitted `date_histogram` object
    pub fn key(&self) -> &'static str {
        match self {
            IntervalKind::Calendar => "calendar_interval",
            IntervalKind::Fixed => "fixed_interval",
            IntervalKind::Legacy => "interval",
        }
    }
}

// ============================================================================
// Variants
// ============================================================================

/// Bucket per distinct value of a field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TermsAggregation {
    pub field: String,
    pub include: Option<String>,
    pub size: Option<u64>,
    #[serde(flatten)]
    common: AggregationCommon,
}

impl TermsAggregation {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }
}

/// Single-value metric over a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregation {
    pub metric: MetricType,
    pub field: String,
    #[serde(flatten)]
    common: AggregationCommon,
}

impl MetricAggregation {
    pub fn new(metric: MetricType, field: impl Into<String>) -> Self {
        Self {
            metric,
            field: field.into(),
            common: AggregationCommon::default(),
        }
    }

    /// Build from a type tag, rejecting tags outside [`MetricType`]
    pub fn from_tag(tag: &str, field: impl Into<String>) -> Result<Self, ParseError> {
        Ok(Self::new(tag.parse()?, field))
    }
}

/// Percentile ranks of a field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PercentilesAggregation {
    pub field: String,
    pub percents: Vec<f64>,
    #[serde(flatten)]
    common: AggregationCommon,
}

impl PercentilesAggregation {
    pub fn new(field: impl Into<String>, percents: Vec<f64>) -> Self {
        Self {
            field: field.into(),
            percents,
            common: AggregationCommon::default(),
        }
    }
}

/// Time buckets of a date field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DateHistogramAggregation {
    pub field: String,
    pub interval: String,
    pub interval_kind: IntervalKind,
    pub format: Option<String>,
    pub time_zone: Option<String>,
    #[serde(flatten)]
    common: AggregationCommon,
}

impl DateHistogramAggregation {
    pub fn new(field: impl Into<String>, interval: impl Into<String>, kind: IntervalKind) -> Self {
        Self {
            field: field.into(),
            interval: interval.into(),
            interval_kind: kind,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }
}

/// One bucket of a date range aggregation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DateRangeBucket {
    pub key: Option<String>,
    pub from: Option<Value>,
    pub to: Option<Value>,
}

/// Explicit date ranges over a field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DateRangeAggregation {
    pub field: String,
    pub format: Option<String>,
    pub ranges: Vec<DateRangeBucket>,
    #[serde(flatten)]
    common: AggregationCommon,
}

impl DateRangeAggregation {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn with_range(
        mut self,
        key: Option<&str>,
        from: Option<Value>,
        to: Option<Value>,
    ) -> Self {
        self.ranges.push(DateRangeBucket {
            key: key.map(str::to_string),
            from,
            to,
        });
        self
    }
}

/// Single bucket of documents matching an embedded query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterAggregation {
    pub filter: Clause,
    #[serde(flatten)]
    common: AggregationCommon,
}

impl FilterAggregation {
    pub fn new(filter: Clause) -> Self {
        Self {
            filter,
            common: AggregationCommon::default(),
        }
    }
}

/// Aggregation computed from the output of sibling aggregations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineAggregation {
    pub pipeline: PipelineType,
    pub buckets_path: String,
    #[serde(flatten)]
    common: AggregationCommon,
}

impl PipelineAggregation {
    pub fn new(pipeline: PipelineType, buckets_path: impl Into<String>) -> Self {
        Self {
            pipeline,
            buckets_path: buckets_path.into(),
            common: AggregationCommon::default(),
        }
    }

    /// Build from a type tag, rejecting tags outside [`PipelineType`]
    pub fn from_tag(tag: &str, buckets_path: impl Into<String>) -> Result<Self, ParseError> {
        Ok(Self::new(tag.parse()?, buckets_path))
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// A bucket, metric or pipeline aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Terms(TermsAggregation),
    Metric(MetricAggregation),
    Percentiles(PercentilesAggregation),
    DateHistogram(DateHistogramAggregation),
    DateRange(DateRangeAggregation),
    Filter(FilterAggregation),
    Pipeline(PipelineAggregation),
}

impl Aggregation {
    pub fn kind(&self) -> AggregationKind {
        match self {
            Aggregation::Terms(_) => AggregationKind::Terms,
            Aggregation::Metric(_) => AggregationKind::Metric,
            Aggregation::Percentiles(_) => AggregationKind::Percentiles,
            Aggregation::DateHistogram(_) => AggregationKind::DateHistogram,
            Aggregation::DateRange(_) => AggregationKind::DateRange,
            Aggregation::Filter(_) => AggregationKind::Filter,
            Aggregation::Pipeline(_) => AggregationKind::Pipeline,
        }
    }

    fn common(&self) -> &AggregationCommon {
        match self {
            Aggregation::Terms(agg) => &agg.common,
            Aggregation::Metric(agg) => &agg.common,
            Aggregation::Percentiles(agg) => &agg.common,
            Aggregation::DateHistogram(agg) => &agg.common,
            Aggregation::DateRange(agg) => &agg.common,
            Aggregation::Filter(agg) => &agg.common,
            Aggregation::Pipeline(agg) => &agg.common,
        }
    }

    fn common_mut(&mut self) -> &mut AggregationCommon {
        match self {
            Aggregation::Terms(agg) => &mut agg.common,
            Aggregation::Metric(agg) => &mut agg.common,
            Aggregation::Percentiles(agg) => &mut agg.common,
            Aggregation::DateHistogram(agg) => &mut agg.common,
            Aggregation::DateRange(agg) => &mut agg.common,
            Aggregation::Filter(agg) => &mut agg.common,
            Aggregation::Pipeline(agg) => &mut agg.common,
        }
    }

    /// Attach a named sub-aggregation
    pub fn add_nested(&mut self, name: impl Into<String>, aggregation: impl Into<Aggregation>) {
        self.common_mut()
            .nested
            .insert(name.into(), aggregation.into());
    }

    /// Builder form of [`Aggregation::add_nested`]
    pub fn with_nested(
        mut self,
        name: impl Into<String>,
        aggregation: impl Into<Aggregation>,
    ) -> Self {
        self.add_nested(name, aggregation);
        self
    }

    pub fn get_nested(&self) -> &Aggregations {
        &self.common().nested
    }

    /// Set an extra parameter copied into the emitted object
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.common_mut().params.insert(key.into(), value.into());
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_param(key, value);
        self
    }

    pub fn get_params(&self) -> &Map<String, Value> {
        &self.common().params
    }
}

impl From<TermsAggregation> for Aggregation {
    fn from(agg: TermsAggregation) -> Self {
        Aggregation::Terms(agg)
    }
}

impl From<MetricAggregation> for Aggregation {
    fn from(agg: MetricAggregation) -> Self {
        Aggregation::Metric(agg)
    }
}

impl From<PercentilesAggregation> for Aggregation {
    fn from(agg: PercentilesAggregation) -> Self {
        Aggregation::Percentiles(agg)
    }
}

impl From<DateHistogramAggregation> for Aggregation {
    fn from(agg: DateHistogramAggregation) -> Self {
        Aggregation::DateHistogram(agg)
    }
}

impl From<DateRangeAggregation> for Aggregation {
    fn from(agg: DateRangeAggregation) -> Self {
        Aggregation::DateRange(agg)
    }
}

impl From<FilterAggregation> for Aggregation {
    fn from(agg: FilterAggregation) -> Self {
        Aggregation::Filter(agg)
    }
}

impl From<PipelineAggregation> for Aggregation {
    fn from(agg: PipelineAggregation) -> Self {
        Aggregation::Pipeline(agg)
    }
}
