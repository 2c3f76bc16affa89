use roxmltree::Node;

/// A thin view over an `om:Element` in the designer metadata.
#[derive(Clone, Copy)]
pub(super) struct Element<'a, 'input> {
    node: Node<'a, 'input>,
}

impl<'a, 'input> Element<'a, 'input> {
    pub(super) fn new(node: Node<'a, 'input>) -> Self {
        Self { node }
    }

    pub(super) fn type_name(&self) -> &'a str {
        self.node.attribute("Type").unwrap_or("")
    }

    pub(super) fn oid(&self) -> &'a str {
        self.node.attribute("OID").unwrap_or("")
    }

    pub(super) fn parent_link(&self) -> &'a str {
        self.node.attribute("ParentLink").unwrap_or("")
    }

    /// Value of the `om:Property` child with the given name.
    pub(super) fn property(&self, name: &str) -> Option<&'a str> {
        self.node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "Property")
            .find(|n| n.attribute("Name") == Some(name))
            .and_then(|n| n.attribute("Value"))
    }

    /// Property value, or an empty string when absent.
    pub(super) fn text(&self, name: &str) -> String {
        self.property(name).unwrap_or("").trim().to_string()
    }

    pub(super) fn flag(&self, name: &str) -> bool {
        self.property(name)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    pub(super) fn name(&self) -> String {
        let name = self.text("Name");
        if name.is_empty() {
            self.type_name().to_string()
        } else {
            name
        }
    }

    /// Direct `om:Element` children in document order.
    pub(super) fn elements(&self) -> impl Iterator<Item = Element<'a, 'input>> + use<'a, 'input> {
        self.node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "Element")
            .map(Element::new)
    }

    pub(super) fn elements_of_type(
        &self,
        type_name: &'static str,
    ) -> impl Iterator<Item = Element<'a, 'input>> + use<'a, 'input> {
        self.elements().filter(move |e| e.type_name() == type_name)
    }

    /// First descendant `om:Element` (self excluded) with the given type.
    pub(super) fn find_descendant(&self, type_name: &str) -> Option<Element<'a, 'input>> {
        self.node
            .descendants()
            .skip(1)
            .filter(|n| n.is_element() && n.tag_name().name() == "Element")
            .find(|n| n.attribute("Type") == Some(type_name))
            .map(Element::new)
    }
}
