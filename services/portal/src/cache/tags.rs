//! services/portal/src/cache/tags.rs
//!
//! Entity tags used to link cached queries ("providers") with the mutations that
//! invalidate them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    User,
    Course,
    Lesson,
    Module,
    Progress,
    Assessment,
    Discussion,
    Path,
    Subscription,
    Search,
    Recommendation,
}

impl Tag {
    pub const ALL: [Tag; 11] = [
        Tag::User,
        Tag::Course,
        Tag::Lesson,
        Tag::Module,
        Tag::Progress,
        Tag::Assessment,
        Tag::Discussion,
        Tag::Path,
        Tag::Subscription,
        Tag::Search,
        Tag::Recommendation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::User => "User",
            Tag::Course => "Course",
            Tag::Lesson => "Lesson",
            Tag::Module => "Module",
            Tag::Progress => "Progress",
            Tag::Assessment => "Assessment",
            Tag::Discussion => "Discussion",
            Tag::Path => "Path",
            Tag::Subscription => "Subscription",
            Tag::Search => "Search",
            Tag::Recommendation => "Recommendation",
        }
    }
}

/// A tag, optionally narrowed to one entity id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagRef {
    pub tag: Tag,
    pub id: Option<String>,
}

impl TagRef {
    /// The whole tag: as an invalidation it hits every entry providing `tag`.
    pub fn all(tag: Tag) -> Self {
        Self { tag, id: None }
    }

    pub fn id(tag: Tag, id: impl Into<String>) -> Self {
        Self {
            tag,
            id: Some(id.into()),
        }
    }

    /// Whether invalidating `self` affects an entry that provides `provided`.
    ///
    /// A bare tag matches every provided tag of the same kind; an id-qualified
    /// tag only matches the same id.
    pub fn invalidates(&self, provided: &TagRef) -> bool {
        self.tag == provided.tag && (self.id.is_none() || self.id == provided.id)
    }
}

impl From<Tag> for TagRef {
    fn from(tag: Tag) -> Self {
        TagRef::all(tag)
    }
}

impl fmt::Display for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.tag.as_str(), id),
            None => f.write_str(self.tag.as_str()),
        }
    }
}
