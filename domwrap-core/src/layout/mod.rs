//! Layout computation module.
//!
//! Builds a `TaffyTree` from the connected part of a `Document`, reading each
//! element's inline `style` attribute, runs the Flexbox/Block solver and
//! writes the absolute border box of every node back onto the document. Those
//! boxes are what the wrapper geometry getters report.
//!
//! Mutations mark the document dirty; [`refresh`] lays it out again with the
//! config stored on the document, so geometry reads always see the current
//! tree.
//!
//! Text is measured with a fixed advance per character instead of real
//! shaping, which is enough for sizes and positions to respond to content.
//!
//! Supported dimension units: px, %, vw, vh, em, rem, auto.
//! Supported display modes: flex, grid, block, none.
//! Box model properties mapped: margin-*, padding-*, border-*-width.

use taffy::TaffyTree;
use taffy::geometry::Size;
use taffy::style::{
    AvailableSpace, Dimension, Display, FlexDirection, LengthPercentage, LengthPercentageAuto,
    Style,
};
use taffy::tree::NodeId as TaffyNodeId;

use crate::dom::{Document, DomError, LayoutBox, NodeData, NodeId};
use crate::style::{self, StyleValue};

/// Viewport and text metrics used by [`compute_layout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub root_font_size: f32,
    /// Advance of one character as a fraction of the font size.
    pub glyph_advance: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            viewport_width: 800.0,
            viewport_height: 600.0,
            root_font_size: 16.0,
            glyph_advance: 0.5,
            line_height: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LayoutContext {
    node: NodeId,
    text: Option<TextMetrics>,
}

#[derive(Debug, Clone, Copy)]
struct TextMetrics {
    chars: usize,
    longest_word: usize,
    font_size: f32,
}

/// Parsed form of a length-like declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Length {
    Auto,
    Px(f32),
    Percent(f32),
    Vw(f32),
    Vh(f32),
    Em(f32),
    Rem(f32),
}

fn parse_length(val: &str) -> Option<Length> {
    let trimmed = val.trim();
    if trimmed == "auto" {
        return Some(Length::Auto);
    }
    if trimmed == "0" {
        return Some(Length::Px(0.0));
    }
    let units: [(&str, fn(f32) -> Length); 6] = [
        ("px", Length::Px),
        ("%", Length::Percent),
        ("vw", Length::Vw),
        ("vh", Length::Vh),
        ("rem", Length::Rem),
        ("em", Length::Em),
    ];
    units.iter().find_map(|&(suffix, make)| {
        trimmed
            .strip_suffix(suffix)
            .and_then(|num| num.trim().parse::<f32>().ok())
            .map(make)
    })
}

struct Resolver<'a> {
    config: &'a LayoutConfig,
    font_size: f32,
}

impl Resolver<'_> {
    fn px(&self, length: Length) -> Option<f32> {
        match length {
            Length::Px(num) => Some(num),
            Length::Vw(num) => Some(num / 100.0 * self.config.viewport_width),
            Length::Vh(num) => Some(num / 100.0 * self.config.viewport_height),
            Length::Em(num) => Some(num * self.font_size),
            Length::Rem(num) => Some(num * self.config.root_font_size),
            Length::Auto | Length::Percent(_) => None,
        }
    }

    fn dimension(&self, length: Length) -> Dimension {
        match length {
            Length::Auto => Dimension::auto(),
            Length::Percent(p) => Dimension::percent(p / 100.0),
            other => self.px(other).map_or(Dimension::auto(), Dimension::length),
        }
    }

    fn length_percentage_auto(&self, length: Length) -> LengthPercentageAuto {
        match length {
            Length::Auto => LengthPercentageAuto::auto(),
            Length::Percent(p) => LengthPercentageAuto::percent(p / 100.0),
            other => self.px(other).map_or(LengthPercentageAuto::auto(), LengthPercentageAuto::length),
        }
    }

    fn length_percentage(&self, length: Length) -> Option<LengthPercentage> {
        match length {
            Length::Auto => None,
            Length::Percent(p) => Some(LengthPercentage::percent(p / 100.0)),
            other => self.px(other).map(LengthPercentage::length),
        }
    }
}

/// Lays out the connected tree and stores every node's box on `document`.
pub fn compute_layout(document: &mut Document, config: &LayoutConfig) -> Result<(), DomError> {
    let mut tree: TaffyTree<LayoutContext> = TaffyTree::new();

    let root = document.root_id;
    let root_taffy_node = build_taffy_node(&mut tree, document, root, config, config.root_font_size)?;

    let mut root_style = tree.style(root_taffy_node)?.clone();
    root_style.size = Size {
        width: Dimension::length(config.viewport_width),
        height: Dimension::length(config.viewport_height),
    };
    tree.set_style(root_taffy_node, root_style)?;

    let available_space = Size {
        width: AvailableSpace::Definite(config.viewport_width),
        height: AvailableSpace::Definite(config.viewport_height),
    };

    tree.compute_layout_with_measure(
        root_taffy_node,
        available_space,
        |known_dimensions, available_space, _node_id, context: Option<&mut LayoutContext>, _style| {
            let Some(text) = context.and_then(|ctx| ctx.text) else {
                return Size::ZERO;
            };
            measure_text(text, known_dimensions.width, available_space.width, config)
        },
    )?;

    let mut stored = 0usize;
    store_boxes(&tree, root_taffy_node, 0.0, 0.0, document, &mut stored)?;
    document.mark_laid_out(*config);
    tracing::debug!(nodes = stored, "layout stored");
    Ok(())
}

/// Recomputes layout with the document's own config if anything changed
/// since the last pass.
pub fn refresh(document: &mut Document) -> Result<(), DomError> {
    if !document.needs_layout() {
        return Ok(());
    }
    let config = *document.layout_config();
    compute_layout(document, &config)
}

fn measure_text(
    text: TextMetrics,
    known_width: Option<f32>,
    available_width: AvailableSpace,
    config: &LayoutConfig,
) -> Size<f32> {
    let advance = text.font_size * config.glyph_advance;
    let line_height = (text.font_size * config.line_height).max(1.0);
    let full_width = text.chars as f32 * advance;
    if text.chars == 0 {
        return Size::ZERO;
    }

    let width_constraint = match (known_width, available_width) {
        (Some(w), _) => w,
        (None, AvailableSpace::Definite(w)) if w.is_finite() && w > 0.0 => w,
        (None, AvailableSpace::MinContent) => text.longest_word as f32 * advance,
        _ => full_width,
    };

    let width = full_width.min(width_constraint.max(advance));
    let lines = (full_width / width.max(advance)).ceil().max(1.0);
    Size {
        width,
        height: lines * line_height,
    }
}

fn build_taffy_node(
    tree: &mut TaffyTree<LayoutContext>,
    document: &Document,
    node_id: NodeId,
    config: &LayoutConfig,
    inherited_font_size: f32,
) -> Result<TaffyNodeId, DomError> {
    let mut style = Style::DEFAULT;

    if let Some(text) = document.text(node_id) {
        let metrics = TextMetrics {
            chars: text.chars().count(),
            longest_word: text.split_whitespace().map(|w| w.chars().count()).max().unwrap_or(0),
            font_size: inherited_font_size,
        };
        return Ok(tree.new_leaf_with_context(
            style,
            LayoutContext { node: node_id, text: Some(metrics) },
        )?);
    }

    match &document.node(node_id)?.data {
        NodeData::Text(_) => {}
        NodeData::Root => {
            style.flex_direction = FlexDirection::Column;
        }
        NodeData::Element(data) => {
            let declarations = style::decode(data.attribute("style"));
            let value_of = |name: &str| match declarations.get(name) {
                Some(StyleValue::Value(v)) => Some(v.as_str()),
                _ => None,
            };

            let mut resolver = Resolver { config, font_size: inherited_font_size };
            if let Some(size) = value_of("font-size").and_then(parse_length) {
                resolver.font_size = match size {
                    Length::Percent(p) => p / 100.0 * inherited_font_size,
                    other => resolver.px(other).unwrap_or(inherited_font_size),
                };
            }

            match value_of("display") {
                Some("flex") => style.display = Display::Flex,
                Some("grid") => style.display = Display::Grid,
                Some("none") => style.display = Display::None,
                Some("block") => style.display = Display::Block,
                _ => {}
            }

            match value_of("flex-direction") {
                Some("row") => style.flex_direction = FlexDirection::Row,
                Some("column") => style.flex_direction = FlexDirection::Column,
                _ => {
                    if value_of("display") != Some("flex") {
                        style.flex_direction = FlexDirection::Column;
                    }
                }
            }

            for (key, value) in &declarations {
                let StyleValue::Value(value) = value else {
                    continue;
                };
                let Some(length) = parse_length(value) else {
                    continue;
                };
                match key.as_str() {
                    "width" => style.size.width = resolver.dimension(length),
                    "height" => style.size.height = resolver.dimension(length),
                    "margin-top" => style.margin.top = resolver.length_percentage_auto(length),
                    "margin-right" => style.margin.right = resolver.length_percentage_auto(length),
                    "margin-bottom" => style.margin.bottom = resolver.length_percentage_auto(length),
                    "margin-left" => style.margin.left = resolver.length_percentage_auto(length),
                    "padding-top" | "padding-right" | "padding-bottom" | "padding-left"
                    | "border-width" | "border-top-width" | "border-right-width"
                    | "border-bottom-width" | "border-left-width" => {
                        let Some(lp) = resolver.length_percentage(length) else {
                            continue;
                        };
                        match key.as_str() {
                            "padding-top" => style.padding.top = lp,
                            "padding-right" => style.padding.right = lp,
                            "padding-bottom" => style.padding.bottom = lp,
                            "padding-left" => style.padding.left = lp,
                            "border-top-width" => style.border.top = lp,
                            "border-right-width" => style.border.right = lp,
                            "border-bottom-width" => style.border.bottom = lp,
                            "border-left-width" => style.border.left = lp,
                            _ => {
                                style.border.top = lp;
                                style.border.right = lp;
                                style.border.bottom = lp;
                                style.border.left = lp;
                            }
                        }
                    }
                    _ => {}
                }
            }

            let children = document
                .child_nodes(node_id)
                .into_iter()
                .map(|child| build_taffy_node(tree, document, child, config, resolver.font_size))
                .collect::<Result<Vec<_>, _>>()?;
            let id = tree.new_with_children(style, &children)?;
            tree.set_node_context(id, Some(LayoutContext { node: node_id, text: None }))?;
            return Ok(id);
        }
    }

    let children = document
        .child_nodes(node_id)
        .into_iter()
        .map(|child| build_taffy_node(tree, document, child, config, inherited_font_size))
        .collect::<Result<Vec<_>, _>>()?;
    let id = tree.new_with_children(style, &children)?;
    tree.set_node_context(id, Some(LayoutContext { node: node_id, text: None }))?;
    Ok(id)
}

fn store_boxes(
    tree: &TaffyTree<LayoutContext>,
    taffy_node: TaffyNodeId,
    offset_x: f32,
    offset_y: f32,
    document: &mut Document,
    stored: &mut usize,
) -> Result<(), DomError> {
    let layout = tree.layout(taffy_node)?;
    let abs_x = offset_x + layout.location.x;
    let abs_y = offset_y + layout.location.y;

    if let Some(ctx) = tree.get_node_context(taffy_node) {
        document.set_layout_box(
            ctx.node,
            LayoutBox {
                x: abs_x,
                y: abs_y,
                width: layout.size.width,
                height: layout.size.height,
            },
        );
        *stored += 1;
    }

    for child in tree.children(taffy_node)? {
        store_boxes(tree, child, abs_x, abs_y, document, stored)?;
    }
    Ok(())
}
