//! Data model for audit documents, decoded at the JSON boundary.
//!
//! Audit JSON is inconsistently shaped across catalog years, so every
//! field is optional and classification happens after decode: a node is
//! a choice node, a constraint-bearing node, an inline constraint, a
//! bare course leaf, or a dead label, in that order. Constraints keep
//! their raw tag string so unrecognized kinds can be reported verbatim.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::is_course_code;

#[derive(Debug, Deserialize)]
pub struct AuditDocument {
    #[serde(default)]
    pub requirement: Option<RequirementNode>,
    #[serde(default)]
    pub uni_req_tree: Option<UniReqTree>,
}

#[derive(Debug, Deserialize)]
pub struct UniReqTree {
    #[serde(default)]
    pub programs: Vec<RequirementNode>,
}

#[derive(Debug, Deserialize)]
pub struct RequirementNode {
    #[serde(default)]
    pub screen_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub choices: Option<Vec<RequirementNode>>,
    #[serde(default, deserialize_with = "lenient")]
    pub constraints: Option<Vec<RawConstraint>>,
    // Some catalog years inline the constraint fields on the node itself.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// What a node turned out to be once its fields are probed.
#[derive(Debug)]
pub enum NodeShape<'a> {
    /// Non-empty `choices`: satisfy one of these sub-requirements.
    Choice(&'a [RequirementNode]),
    /// `constraints` present (possibly empty, which resolves to nothing).
    Constrained(&'a [RawConstraint]),
    /// The node itself is a constraint (`type` + `data` inline).
    InlineConstraint(RawConstraint),
    /// Display name is itself a course code.
    BareCourse(&'a str),
    /// A pure label: no children, no constraints, not course-shaped.
    Dead,
}

impl RequirementNode {
    pub fn display_name(&self) -> &str {
        self.screen_name.as_deref().unwrap_or("")
    }

    pub fn shape(&self) -> NodeShape<'_> {
        if let Some(choices) = &self.choices {
            if !choices.is_empty() {
                return NodeShape::Choice(choices);
            }
        }
        if let Some(constraints) = &self.constraints {
            return NodeShape::Constrained(constraints);
        }
        if let Some(kind) = &self.kind {
            return NodeShape::InlineConstraint(RawConstraint {
                kind: kind.clone(),
                data: self.data.clone().unwrap_or(Value::Null),
            });
        }
        let name = self.display_name();
        if is_course_code(name) {
            return NodeShape::BareCourse(name);
        }
        NodeShape::Dead
    }
}

/// A constraint as it appears on the wire. The tag string is kept so the
/// resolver can report unknown kinds; `data` absorbs any payload shape.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConstraint {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Typed view of a constraint, produced by [`RawConstraint::classify`].
#[derive(Debug)]
pub enum Constraint {
    CourseSet(CourseSetData),
    DepartmentSet(DepartmentSetData),
    ExclusionSet(CourseSetData),
    Unknown(String),
}

impl RawConstraint {
    pub fn classify(&self) -> Constraint {
        match self.kind.as_str() {
            "xfromcourseset" => Constraint::CourseSet(self.decode()),
            "xfromdc" => Constraint::DepartmentSet(self.decode()),
            "notcountcourseset" => Constraint::ExclusionSet(self.decode()),
            other => Constraint::Unknown(other.to_string()),
        }
    }

    // Missing or malformed payload fields decode to empty lists.
    fn decode<T: Default + for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_value(self.data.clone()).unwrap_or_default()
    }
}

/// Payload of course-set and exclusion-set constraints. The format
/// evolved: newer documents put courses and ranges directly on `data`,
/// older ones nest them one level down in `conditional_course_sets`.
/// Both locations are live and must be unioned.
#[derive(Debug, Default, Deserialize)]
pub struct CourseSetData {
    #[serde(default)]
    pub courses: Vec<String>,
    #[serde(default)]
    pub code_ranges: Vec<CodeRange>,
    #[serde(default)]
    pub conditional_course_sets: Vec<ConditionalCourseSet>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConditionalCourseSet {
    #[serde(default)]
    pub courses: Vec<String>,
    #[serde(default)]
    pub code_ranges: Vec<CodeRange>,
}

impl CourseSetData {
    /// Explicit courses from both document shapes.
    pub fn all_courses(&self) -> impl Iterator<Item = &str> {
        self.courses
            .iter()
            .map(String::as_str)
            .chain(
                self.conditional_course_sets
                    .iter()
                    .flat_map(|set| set.courses.iter().map(String::as_str)),
            )
    }

    /// Code ranges from both document shapes.
    pub fn all_ranges(&self) -> impl Iterator<Item = &CodeRange> {
        self.code_ranges.iter().chain(
            self.conditional_course_sets
                .iter()
                .flat_map(|set| set.code_ranges.iter()),
        )
    }
}

/// Payload of department-set constraints: department codes plus
/// additional individual courses.
#[derive(Debug, Default, Deserialize)]
pub struct DepartmentSetData {
    #[serde(default)]
    pub codes: Vec<String>,
    #[serde(default)]
    pub courses: Vec<String>,
}

/// A begin/end course range. Appears both as a two-element array
/// (`["21-120", "21-121"]`) and as an object (`{"begin": .., "end": ..}`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CodeRange {
    Pair(String, String),
    Bounds { begin: String, end: String },
}

impl CodeRange {
    pub fn bounds(&self) -> (&str, &str) {
        match self {
            CodeRange::Pair(begin, end) => (begin, end),
            CodeRange::Bounds { begin, end } => (begin, end),
        }
    }
}

// Absorb shape surprises at the smallest enclosing field: a list that
// fails to decode contributes nothing instead of failing the document.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: for<'a> Deserialize<'a>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}
