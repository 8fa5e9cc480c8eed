//! Well-known index field names.

/// Aggregate full-text field.
pub const DEFAULT: &str = "default";
/// Aggregate stemmed full-text field.
pub const STEMS: &str = "stems";
/// Aggregate full-text field used by administrative search.
pub const ADMIN_DEFAULT: &str = "admindefault";

/// Paths of every element or attribute that produced a generic field.
pub const INDEXED_XPATHS: &str = "indexedXpaths";

pub const TITLE: &str = "title";
pub const TITLE_STEMS: &str = "titlestems";
pub const TITLE_KEY: &str = "titlekey";
pub const DESCRIPTION: &str = "description";
pub const DESCRIPTION_STEMS: &str = "descriptionstems";

/// Primary URL, stored.
pub const URL: &str = "url";
/// Tokenized URL text.
pub const URI: &str = "uri";
/// Encoded URLs for wildcard search.
pub const URL_ENCODED: &str = "urlenc";

/// Encoded ids for exact matching.
pub const ID: &str = "id";
/// Raw ids for display.
pub const ID_VALUE: &str = "idvalue";

pub const NORTH_COORD: &str = "northCoord";
pub const SOUTH_COORD: &str = "southCoord";
pub const EAST_COORD: &str = "eastCoord";
pub const WEST_COORD: &str = "westCoord";
pub const HAS_BOUNDING_BOX: &str = "hasBoundingBox";

pub const IS_JAVA_BEAN: &str = "isJavaBean";
pub const JAVA_BEAN_CLASS: &str = "/javaBean.class//key//className";
pub const JAVA_BEAN_PROPERTY_PREFIX: &str = "/javaBean.property/";

/// Generation marker of the pass that wrote a document.
pub const INDEX_SESSION_ID: &str = "indexSessionId";
/// Collection a document belongs to.
pub const COLLECTION: &str = "collection";
/// Native format of the record.
pub const XML_FORMAT: &str = "xmlFormat";
