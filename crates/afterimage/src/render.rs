//! Node construction and reconciliation for the component.

use crate::props::AfterImageProps;
use common::{AfterImageError, AfterImageResult};
use dom::{DomTree, ElementData, InlineStyle, NodeId, TagName};
use std::time::Duration;

pub const CONTAINER_CLASS: &str = "afterimage";
pub const LOADED_CLASS: &str = "afterimage--loaded";
pub const IMAGE_CLASS: &str = "afterimage__image";
pub const PLACEHOLDER_CLASS: &str = "afterimage__placeholder";

/// Attribute staging the resource locator until the image is visible.
pub const STAGED_SRC_ATTRIBUTE: &str = "data-src";
/// Assigning this attribute starts the fetch.
pub const SRC_ATTRIBUTE: &str = "src";

/// Handles to the nodes a component owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderedNodes {
    pub container: NodeId,
    pub image: NodeId,
    pub placeholder: Option<NodeId>,
}

/// Class attribute of the container.
pub fn container_class(loaded: bool, class_name: Option<&str>) -> String {
    let mut classes = vec![CONTAINER_CLASS];
    if loaded {
        classes.push(LOADED_CLASS);
    }
    if let Some(extra) = class_name {
        classes.extend(extra.split_whitespace());
    }
    classes.join(" ")
}

fn transition_value(transition: Duration) -> String {
    format!("opacity {}ms ease", transition.as_millis())
}

pub fn image_style(loaded: bool, with_placeholder: bool, transition: Duration) -> InlineStyle {
    InlineStyle::new()
        .with("width", "100%")
        .with("height", "auto")
        .with("opacity", if loaded { "1" } else { "0" })
        .with("transition", &transition_value(transition))
        .with(
            "position",
            if with_placeholder { "absolute" } else { "static" },
        )
        .with("left", "0")
}

pub fn placeholder_style(props: &AfterImageProps, loaded: bool, transition: Duration) -> InlineStyle {
    InlineStyle::new()
        .with("width", "100%")
        .with("padding-top", &props.padding_top())
        .with("opacity", if loaded { "0" } else { "1" })
        .with("transition", &transition_value(transition))
        .with("pointer-events", "none")
}

/// Build the component's nodes and append them to `parent`.
///
/// `src` is never rendered; the locator only goes to `data-src`.
pub fn render(
    tree: &mut DomTree,
    parent: NodeId,
    props: &AfterImageProps,
    loaded: bool,
    transition: Duration,
) -> AfterImageResult<RenderedNodes> {
    match tree.get(parent) {
        None => {
            return Err(AfterImageError::not_found(format!(
                "parent node {parent:?}"
            )))
        }
        Some(node) if node.as_text().is_some() => {
            return Err(AfterImageError::invalid("cannot mount under a text node"))
        }
        Some(_) => {}
    }

    let mut container = ElementData::new(TagName::div());
    container.set_attribute(
        "class",
        &container_class(loaded, props.class_name.as_deref()),
    );
    let container = tree.create_element(container);

    let mut image = ElementData::new(TagName::img());
    apply_image(&mut image, props, loaded, transition);
    let image = tree.create_element(image);
    tree.append_child(container, image);

    let placeholder = props
        .with_placeholder
        .then(|| create_placeholder(tree, container, props, loaded, transition));

    tree.append_child(parent, container);

    Ok(RenderedNodes {
        container,
        image,
        placeholder,
    })
}

/// Bring already rendered nodes in line with `props` and the loaded flag.
///
/// Leaves `src` alone: once a fetch started it is never restarted.
pub fn reconcile(
    tree: &mut DomTree,
    nodes: &mut RenderedNodes,
    props: &AfterImageProps,
    loaded: bool,
    transition: Duration,
) -> AfterImageResult<()> {
    let container = tree
        .get_element_mut(nodes.container)
        .ok_or_else(|| AfterImageError::not_found("afterimage container"))?;
    container.set_attribute(
        "class",
        &container_class(loaded, props.class_name.as_deref()),
    );

    let image = tree
        .get_element_mut(nodes.image)
        .ok_or_else(|| AfterImageError::not_found("afterimage image"))?;

    let stale: Vec<String> = image
        .attributes
        .names()
        .filter(|name| !matches!(*name, "class" | "style" | "src" | STAGED_SRC_ATTRIBUTE))
        .filter(|name| !props.forwarded_attributes().any(|(n, _)| n == *name))
        .map(str::to_string)
        .collect();
    for name in stale {
        image.remove_attribute(&name);
    }
    apply_image(image, props, loaded, transition);

    match (props.with_placeholder, nodes.placeholder) {
        (true, Some(placeholder)) => {
            if let Some(elem) = tree.get_element_mut(placeholder) {
                elem.set_style(&placeholder_style(props, loaded, transition));
            }
        }
        (true, None) => {
            nodes.placeholder = Some(create_placeholder(
                tree,
                nodes.container,
                props,
                loaded,
                transition,
            ));
        }
        (false, Some(placeholder)) => {
            tree.remove(placeholder);
            nodes.placeholder = None;
        }
        (false, None) => {}
    }

    Ok(())
}

fn apply_image(image: &mut ElementData, props: &AfterImageProps, loaded: bool, transition: Duration) {
    for (name, value) in props.forwarded_attributes() {
        image.set_attribute(name, value);
    }
    image.set_attribute("class", IMAGE_CLASS);
    image.set_attribute(STAGED_SRC_ATTRIBUTE, &props.src);
    image.set_style(&image_style(loaded, props.with_placeholder, transition));
}

fn create_placeholder(
    tree: &mut DomTree,
    container: NodeId,
    props: &AfterImageProps,
    loaded: bool,
    transition: Duration,
) -> NodeId {
    let mut placeholder = ElementData::new(TagName::div());
    placeholder.set_attribute("class", PLACEHOLDER_CLASS);
    placeholder.set_style(&placeholder_style(props, loaded, transition));

    let placeholder = tree.create_element(placeholder);
    tree.append_child(container, placeholder);
    placeholder
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::serialize_outer_html;

    const FADE: Duration = Duration::from_millis(300);

    #[test]
    fn test_container_class() {
        assert_eq!(container_class(false, None), "afterimage");
        assert_eq!(container_class(true, None), "afterimage afterimage--loaded");
        assert_eq!(
            container_class(true, Some("  hero  wide ")),
            "afterimage afterimage--loaded hero wide"
        );
    }

    #[test]
    fn test_render_markup() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let props = AfterImageProps::new("https://x/1600x900").attribute("alt", "Sea");

        let nodes = render(&mut tree, root, &props, false, FADE).unwrap();
        assert_eq!(
            serialize_outer_html(&tree, nodes.container),
            concat!(
                r#"<div class="afterimage">"#,
                r#"<img alt="Sea" class="afterimage__image" data-src="https://x/1600x900" "#,
                r#"style="width: 100%; height: auto; opacity: 0; transition: opacity 300ms ease; position: absolute; left: 0">"#,
                r#"<div class="afterimage__placeholder" "#,
                r#"style="width: 100%; padding-top: 56.25%; opacity: 1; transition: opacity 300ms ease; pointer-events: none">"#,
                r#"</div></div>"#,
            )
        );
        assert_eq!(tree.get_attribute(nodes.image, "src"), None);
        assert_eq!(tree.parent(nodes.container), Some(root));
    }

    #[test]
    fn test_render_without_placeholder() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let props = AfterImageProps::new("a.png").with_placeholder(false);

        let nodes = render(&mut tree, root, &props, false, FADE).unwrap();
        assert!(nodes.placeholder.is_none());
        assert_eq!(tree.children(nodes.container).count(), 1);
        let style = tree.get_element(nodes.image).unwrap().style();
        assert_eq!(style.get("position"), Some("static"));
    }

    #[test]
    fn test_render_rejects_bad_parent() {
        let mut tree = DomTree::new();
        let text = tree.create_text("caption".to_string());
        let props = AfterImageProps::new("a.png");

        assert!(matches!(
            render(&mut tree, text, &props, false, FADE),
            Err(AfterImageError::InvalidOperation(_))
        ));

        tree.remove(text);
        assert!(matches!(
            render(&mut tree, text, &props, false, FADE),
            Err(AfterImageError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_reconcile_loaded_state() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let props = AfterImageProps::new("a.png").class_name("hero");
        let mut nodes = render(&mut tree, root, &props, false, FADE).unwrap();
        tree.set_attribute(nodes.image, "src", "a.png");

        reconcile(&mut tree, &mut nodes, &props, true, FADE).unwrap();

        let container = tree.get_element(nodes.container).unwrap();
        assert!(container.has_class(LOADED_CLASS));
        assert!(container.has_class("hero"));
        let image = tree.get_element(nodes.image).unwrap();
        assert_eq!(image.style().get("opacity"), Some("1"));
        assert_eq!(image.get_attribute("src"), Some("a.png"));
        let placeholder = tree.get_element(nodes.placeholder.unwrap()).unwrap();
        assert_eq!(placeholder.style().get("opacity"), Some("0"));
    }

    #[test]
    fn test_reconcile_new_props() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let props = AfterImageProps::new("a.png")
            .attribute("alt", "old")
            .attribute("title", "gone");
        let mut nodes = render(&mut tree, root, &props, false, FADE).unwrap();

        let props = AfterImageProps::new("b.png")
            .attribute("alt", "new")
            .aspect(1.0, 2.0)
            .with_placeholder(false);
        let old_placeholder = nodes.placeholder.unwrap();
        reconcile(&mut tree, &mut nodes, &props, false, FADE).unwrap();

        let image = tree.get_element(nodes.image).unwrap();
        assert_eq!(image.get_attribute("alt"), Some("new"));
        assert!(!image.has_attribute("title"));
        assert_eq!(image.get_attribute("data-src"), Some("b.png"));
        assert!(nodes.placeholder.is_none());
        assert!(!tree.contains(old_placeholder));

        let props = props.with_placeholder(true);
        reconcile(&mut tree, &mut nodes, &props, false, FADE).unwrap();
        let placeholder = tree.get_element(nodes.placeholder.unwrap()).unwrap();
        assert_eq!(placeholder.style().get("padding-top"), Some("50%"));
    }
}
