#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use soapsig_c14n::C14nMode;
use soapsig_core::{Error, Result};
use soapsig_xml::{Document, NodeSet};

/// Data flowing through the transform pipeline.
pub enum TransformData<'a> {
    /// A node set over a document (for XML-aware transforms like C14N).
    Xml {
        doc: &'a Document,
        node_set: NodeSet,
    },
    /// Raw octets.
    Binary(Vec<u8>),
}

impl TransformData<'_> {
    /// Convert to octets, applying inclusive C14N if the data is still a node set.
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        match self {
            TransformData::Binary(data) => Ok(data.clone()),
            TransformData::Xml { doc, node_set } => {
                soapsig_c14n::canonicalize(doc, C14nMode::Inclusive, Some(node_set), &[])
            }
        }
    }
}

/// Trait for individual transforms.
pub trait Transform: Send + Sync {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Execute the transform on the given data.
    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>>;
}

/// A pipeline of transforms executed in sequence.
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Add a transform to the pipeline.
    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Execute all transforms in order.
    pub fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>> {
        let mut data = input;
        for transform in &self.transforms {
            data = transform.execute(data)?;
        }
        Ok(data)
    }

    /// Algorithm URIs of the transforms, in execution order.
    pub fn uris(&self) -> impl Iterator<Item = &str> + '_ {
        self.transforms.iter().map(|t| t.uri())
    }

    /// Number of transforms in the pipeline.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Check if pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

// ── C14N Transform ───────────────────────────────────────────────────

/// A canonicalization transform.
pub struct C14nTransform {
    mode: C14nMode,
    inclusive_prefixes: Vec<String>,
}

impl C14nTransform {
    pub fn new(mode: C14nMode, inclusive_prefixes: Vec<String>) -> Self {
        Self {
            mode,
            inclusive_prefixes,
        }
    }

    pub fn mode(&self) -> C14nMode {
        self.mode
    }

    pub fn inclusive_prefixes(&self) -> &[String] {
        &self.inclusive_prefixes
    }
}

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        self.mode.uri()
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>> {
        match input {
            TransformData::Xml { doc, node_set } => {
                let bytes = soapsig_c14n::canonicalize(
                    doc,
                    self.mode,
                    Some(&node_set),
                    &self.inclusive_prefixes,
                )?;
                Ok(TransformData::Binary(bytes))
            }
            TransformData::Binary(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| Error::MalformedInputXml(format!("invalid UTF-8: {e}")))?;
                let doc = Document::parse(text)?;
                let bytes =
                    soapsig_c14n::canonicalize(&doc, self.mode, None, &self.inclusive_prefixes)?;
                Ok(TransformData::Binary(bytes))
            }
        }
    }
}
