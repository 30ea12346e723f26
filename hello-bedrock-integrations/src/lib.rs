// show feature flags in the generated documentation
// https://doc.rust-lang.org/rustdoc/unstable-features.html#extensions-to-the-doc-attribute
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Integrations with hosted model providers.

#[cfg(feature = "aws-bedrock")]
pub mod aws_bedrock;
