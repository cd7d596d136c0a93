bitflags::bitflags! {
    /// Per-property serialization hints.
    ///
    /// A hint is active while its property (and any nested object) is
    /// processed and is restored afterwards.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Hint: u32 {
        /// The object's type is fixed by the schema; no class tag is written.
        const STATIC_TYPE = 0x01;
        /// Owned child collections are skipped.
        const IGNORE_CHILDREN = 0x02;
        /// Scalars become child elements instead of attributes.
        const XML_ELEMENT = 0x04;
        /// The scalar is the element's text content.
        const XML_CDATA = 0x08;
        /// Written even when empty.
        const XML_MANDATORY = 0x10;
        const DB_TABLE = 0x20;
        const SPLIT_TIME = 0x40;
        /// The property is part of the object's Index.
        const INDEX_ATTRIBUTE = 0x80;
    }
}
