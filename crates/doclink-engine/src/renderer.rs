//! Column set rendering
//!
//! Turns the accumulated staging column names into the three fragment lists
//! used by the SQL templates. All passes walk the same name list, so the
//! n-th typed declaration, reference and identifier describe the same column.

use crate::graph::MetadataGraph;
use doclink_core::{trim_separator, ColumnClass, CreationType, ModelError};
use std::collections::BTreeMap;

/// Which fragment a render pass emits per column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    /// `,[Prompt] <type>` column declarations
    TypedDeclarations,

    /// `,[Prompt]` column references
    References,

    /// Property ids or stamp field select expressions
    Identifiers,
}

/// Fragments of one column class, one entry per chosen column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedColumns {
    pub typed: Vec<String>,
    pub references: Vec<String>,
    pub identifiers: Vec<String>,

    /// Bare property or stamp field id of each column
    pub ids: Vec<i64>,
}

impl RenderedColumns {
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn pass(&self, pass: RenderPass) -> &[String] {
        match pass {
            RenderPass::TypedDeclarations => &self.typed,
            RenderPass::References => &self.references,
            RenderPass::Identifiers => &self.identifiers,
        }
    }

    /// Concatenated fragments of one pass with the final separator trimmed
    pub fn to_sql(&self, pass: RenderPass) -> String {
        join_fragments(self.pass(pass))
    }

    /// Identifier list minus its first element
    ///
    /// A single identifier yields an empty pivot list.
    pub fn pivot_sql(&self) -> String {
        join_fragments(self.identifiers.get(1..).unwrap_or_default())
    }

    /// Id of the first column, the one left out of the pivot list
    pub fn anchor_id(&self) -> Option<i64> {
        self.ids.first().copied()
    }
}

fn join_fragments(fragments: &[String]) -> String {
    trim_separator(&fragments.concat()).to_string()
}

/// Rendered header and detail columns of one export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    pub creation: Option<CreationType>,
    pub classes: BTreeMap<ColumnClass, RenderedColumns>,
}

impl ColumnSet {
    /// Columns of `class`; empty when nothing was chosen for it
    pub fn class(&self, class: ColumnClass) -> RenderedColumns {
        self.classes.get(&class).cloned().unwrap_or_default()
    }

    pub fn header(&self) -> RenderedColumns {
        self.class(ColumnClass::Header)
    }

    pub fn detail(&self) -> RenderedColumns {
        self.class(ColumnClass::Detail)
    }
}

/// Renders staging columns against a populated graph
pub struct ColumnSetRenderer<'g> {
    graph: &'g MetadataGraph,
}

impl<'g> ColumnSetRenderer<'g> {
    pub fn new(graph: &'g MetadataGraph) -> Self {
        Self { graph }
    }

    /// Render one pass of one column class as a single string
    pub fn render(&self, creation: CreationType, class: ColumnClass, pass: RenderPass) -> Result<String, ModelError> {
        Ok(self.render_class(creation, class)?.to_sql(pass))
    }

    /// Render all three passes of one column class
    ///
    /// Document-type exports resolve names as property formatted prompts,
    /// stamp exports as stamp field captions.
    pub fn render_class(&self, creation: CreationType, class: ColumnClass) -> Result<RenderedColumns, ModelError> {
        let names = self.graph.staging_columns(class);
        let mut rendered = RenderedColumns::default();

        match creation {
            CreationType::DocType => {
                for name in names {
                    let property = self.graph.property_by_formatted_prompt(name)?;
                    rendered.typed.push(property.typed_fragment()?);
                    rendered.references.push(property.reference_fragment());
                    rendered.identifiers.push(property.id_fragment());
                    rendered.ids.push(property.property_id);
                }
            }
            CreationType::DistStamp => {
                for name in names {
                    let field = self.graph.stamp_field_by_caption(name)?;
                    rendered.typed.push(field.typed_fragment()?);
                    rendered.references.push(field.reference_fragment());
                    rendered.identifiers.push(field.id_fragment()?);
                    rendered.ids.push(field.id);
                }
            }
            other => return Err(ModelError::InvalidCreationType(other.to_string())),
        }

        tracing::debug!(%creation, %class, columns = rendered.len(), "rendered columns");
        Ok(rendered)
    }

    /// Render header and detail columns
    pub fn render_all(&self, creation: CreationType) -> Result<ColumnSet, ModelError> {
        let mut classes = BTreeMap::new();
        for class in [ColumnClass::Header, ColumnClass::Detail] {
            classes.insert(class, self.render_class(creation, class)?);
        }
        Ok(ColumnSet {
            creation: Some(creation),
            classes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclink_core::{DistributionStampField, ErrorCode, Property, FRAGMENT_SEPARATOR};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn graph() -> MetadataGraph {
        let mut graph = MetadataGraph::new();
        graph.properties = vec![
            Property::new(1, "Invoice #", 0),
            Property::new(2, "Amount Due", 4),
            Property::new(3, "Due Date", 2),
        ];
        graph.stamp_fields = vec![
            DistributionStampField::new(41, Uuid::nil(), "GL Account", 0),
            DistributionStampField::new(42, Uuid::nil(), "Line Amount", 1),
        ];
        graph
    }

    #[test]
    fn test_header_typed_declarations() {
        let mut graph = graph();
        graph.add_staging_table_columns(ColumnClass::Header, ["InvoiceNo", "AmountDue"]);

        let typed = ColumnSetRenderer::new(&graph)
            .render(CreationType::DocType, ColumnClass::Header, RenderPass::TypedDeclarations)
            .unwrap();

        assert_eq!(typed, ",[InvoiceNo] [varchar](250) NULL\r\n\t,[AmountDue] [decimal](18, 2) NULL");
    }

    #[test]
    fn test_passes_align_with_input_order() {
        let mut graph = graph();
        graph.add_staging_table_columns(ColumnClass::Header, ["DueDate", "InvoiceNo", "AmountDue"]);

        let rendered = ColumnSetRenderer::new(&graph)
            .render_class(CreationType::DocType, ColumnClass::Header)
            .unwrap();

        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered.typed[0], ",[DueDate] [datetime] NULL\r\n\t");
        assert_eq!(rendered.references[0], ",[DueDate]\r\n\t");
        assert_eq!(rendered.identifiers[0], ",[3]\r\n\t");
        assert_eq!(rendered.to_sql(RenderPass::Identifiers), ",[3]\r\n\t,[1]\r\n\t,[2]");
        assert_eq!(rendered.to_sql(RenderPass::References), ",[DueDate]\r\n\t,[InvoiceNo]\r\n\t,[AmountDue]");
    }

    #[test]
    fn test_pivot_drops_first_identifier() {
        let mut graph = graph();
        graph.add_staging_table_columns(ColumnClass::Header, ["InvoiceNo", "AmountDue"]);
        graph.add_staging_table_columns(ColumnClass::Detail, ["DueDate"]);

        let set = ColumnSetRenderer::new(&graph).render_all(CreationType::DocType).unwrap();
        assert_eq!(set.header().pivot_sql(), ",[2]");
        assert_eq!(set.header().anchor_id(), Some(1));
        assert_eq!(set.detail().pivot_sql(), "");
        assert_eq!(set.detail().anchor_id(), Some(3));
        assert_eq!(set.detail().to_sql(RenderPass::Identifiers), ",[3]");
    }

    #[test]
    fn test_stamp_fields_by_caption() {
        let mut graph = graph();
        graph.add_staging_table_columns(ColumnClass::Detail, ["GL Account", "Line Amount"]);

        let rendered = ColumnSetRenderer::new(&graph)
            .render_class(CreationType::DistStamp, ColumnClass::Detail)
            .unwrap();

        assert_eq!(
            rendered.to_sql(RenderPass::TypedDeclarations),
            ",[GLAccount] [varchar](250) NULL\r\n\t,[LineAmount] [decimal](18, 2) NULL"
        );
        assert_eq!(
            rendered.to_sql(RenderPass::Identifiers),
            ",[41] --GLAccount\r\n\t,REPLACE([42],'','','''') --LineAmount"
        );
    }

    #[test]
    fn test_empty_class_renders_empty() {
        let graph = graph();
        let set = ColumnSetRenderer::new(&graph).render_all(CreationType::DocType).unwrap();

        assert!(set.header().is_empty());
        assert_eq!(set.header().anchor_id(), None);
        assert_eq!(set.header().to_sql(RenderPass::TypedDeclarations), "");
    }

    #[test]
    fn test_interior_separators_survive() {
        let mut graph = graph();
        graph.add_staging_table_columns(ColumnClass::Header, ["InvoiceNo", "AmountDue"]);

        let references = ColumnSetRenderer::new(&graph)
            .render(CreationType::DocType, ColumnClass::Header, RenderPass::References)
            .unwrap();

        assert_eq!(references.matches(FRAGMENT_SEPARATOR).count(), 1);
        assert!(!references.ends_with(FRAGMENT_SEPARATOR));
    }

    #[test]
    fn test_unknown_name_and_creation_type() {
        let mut graph = graph();
        graph.add_staging_table_columns(ColumnClass::Header, ["InvoiceNo", "Vendor"]);
        let renderer = ColumnSetRenderer::new(&graph);

        let err = renderer.render_class(CreationType::DocType, ColumnClass::Header).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPropertyName);

        let err = renderer.render_all(CreationType::WennSoft).unwrap_err();
        assert_eq!(err, ModelError::InvalidCreationType("wennsoft".to_string()));
    }

    #[test]
    fn test_invalid_data_type_is_fatal() {
        let mut graph = graph();
        graph.properties.push(Property::new(9, "Odd", 7));
        graph.add_staging_table_columns(ColumnClass::Header, ["Odd"]);

        let err = ColumnSetRenderer::new(&graph)
            .render_class(CreationType::DocType, ColumnClass::Header)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDataType);
    }
}
