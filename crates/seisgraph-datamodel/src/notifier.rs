//! Mutation events and their replay.
//!
//! A [`Notifier`] describes one Add, Update or Remove of a node under the
//! parent with a given publicID. Ownership operations queue notifiers in a
//! per-thread pool while notifications are enabled; the pool is drained into
//! a serializable [`NotifierMessage`] and replayed on another copy of the
//! graph with [`NotifierMessage::apply`]. Replay order matters: a notifier
//! whose parent is unknown fails with `ParentNotFound`.

use std::cell::{Cell, RefCell};

use seisgraph_core::{Archive, ArchiveExt, ClassInfo, Hint, Object};
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::identity::IdentityRegistry;
use crate::object::DataObject;
use crate::visitor::{Traversal, Visitor};

seisgraph_core::enumeration! {
    /// Kind of mutation.
    pub enum Operation {
        Add = 1 => "add",
        Remove = 2 => "remove",
        Update = 3 => "update",
    }
}

thread_local! {
    static ENABLED: Cell<bool> = const { Cell::new(false) };
    static PENDING: RefCell<Vec<Notifier>> = const { RefCell::new(Vec::new()) };
}

/// Turn notifier generation on or off for the current thread.
pub fn set_enabled(enabled: bool) {
    ENABLED.set(enabled);
}

pub fn is_enabled() -> bool {
    ENABLED.get()
}

pub(crate) fn queue(notifier: Notifier) {
    PENDING.with_borrow_mut(|pending| pending.push(notifier));
}

/// Drain the current thread's pending notifiers.
pub fn take_pending() -> Vec<Notifier> {
    PENDING.take()
}

/// Queue an `Update` notifier for a changed property of an attached node.
/// Does nothing while notifications are disabled.
pub fn emit_update(object: &dyn DataObject) -> ModelResult<()> {
    if !is_enabled() {
        return Ok(());
    }
    let parent = object.parent_id().ok_or_else(|| {
        ModelError::NotAttached(
            object
                .public_id()
                .unwrap_or(object.class_name())
                .to_string(),
        )
    })?;
    queue(Notifier::capture(parent, object, Operation::Update));
    Ok(())
}

/// Notifiers for `object` and its whole subtree: pre-order for `Add`, so
/// parents come before their children, post-order otherwise.
pub fn capture_tree(parent_id: &str, object: &dyn DataObject, operation: Operation) -> Vec<Notifier> {
    let mut capture = TreeCapture {
        root: address(object),
        root_parent: parent_id,
        operation,
        notifiers: Vec::new(),
    };
    object.accept(&mut capture);
    capture.notifiers
}

fn address(object: &dyn DataObject) -> *const () {
    std::ptr::from_ref(object).cast()
}

struct TreeCapture<'a> {
    root: *const (),
    root_parent: &'a str,
    operation: Operation,
    notifiers: Vec<Notifier>,
}

impl Visitor for TreeCapture<'_> {
    fn traversal(&self) -> Traversal {
        match self.operation {
            Operation::Add => Traversal::TopDown,
            _ => Traversal::BottomUp,
        }
    }

    fn visit(&mut self, object: &dyn DataObject) -> bool {
        let is_root = address(object) == self.root;
        let parent = if is_root {
            Some(self.root_parent)
        } else {
            object.parent_id()
        };
        if let Some(parent) = parent {
            self.notifiers
                .push(Notifier::capture(parent, object, self.operation));
        }
        true
    }
}

/// One mutation of the object graph.
#[derive(Debug, Default)]
pub struct Notifier {
    parent_id: String,
    operation: Operation,
    object: Option<Box<dyn DataObject>>,
}

impl Notifier {
    pub fn new(parent_id: impl Into<String>, operation: Operation, object: Box<dyn DataObject>) -> Self {
        Self {
            parent_id: parent_id.into(),
            operation,
            object: Some(object),
        }
    }

    /// Notifier carrying a property-only copy of `object`.
    pub fn capture(parent_id: &str, object: &dyn DataObject, operation: Operation) -> Self {
        Self::new(parent_id, operation, object.clone_data())
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn object(&self) -> Option<&dyn DataObject> {
        self.object.as_deref()
    }

    /// Replay the mutation on the local graph.
    pub fn apply(self) -> ModelResult<()> {
        let object = self.object.ok_or(ModelError::EmptyNotifier)?;
        let parent = IdentityRegistry::resolve(&self.parent_id)
            .ok_or_else(|| ModelError::ParentNotFound(self.parent_id.clone()))?;
        debug!(
            parent = %self.parent_id,
            operation = %self.operation,
            class = object.class_name(),
            "applying notifier"
        );
        let mut parent = parent.write();
        match self.operation {
            Operation::Add => object.attach_to(&mut *parent),
            Operation::Remove => object.detach_from(&mut *parent),
            Operation::Update => {
                if parent.update_child(&*object)? {
                    Ok(())
                } else {
                    Err(ModelError::ChildNotFound {
                        parent: self.parent_id,
                        child: object
                            .public_id()
                            .unwrap_or(object.class_name())
                            .to_string(),
                    })
                }
            }
        }
    }
}

impl ClassInfo for Notifier {
    const CLASS_NAME: &'static str = "Notifier";
    const BASE_CLASSES: &'static [&'static str] = &["Object"];
}

impl Object for Notifier {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.value("parentID", &mut self.parent_id, Hint::XML_MANDATORY);
        ar.value("operation", &mut self.operation, Hint::XML_MANDATORY);
        ar.polymorphic("object", &mut self.object, "Object", Hint::IGNORE_CHILDREN);
    }
}

/// Serializable batch of notifiers, replayed in order.
#[derive(Debug, Default)]
pub struct NotifierMessage {
    notifiers: Vec<Notifier>,
}

impl NotifierMessage {
    pub fn new(notifiers: Vec<Notifier>) -> Self {
        Self { notifiers }
    }

    /// Drain the current thread's pool into a message.
    pub fn take_pending() -> Self {
        Self::new(take_pending())
    }

    pub fn push(&mut self, notifier: Notifier) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notifier> {
        self.notifiers.iter()
    }

    pub fn into_inner(self) -> Vec<Notifier> {
        self.notifiers
    }

    /// Apply every notifier in order. Stops at the first failure; the
    /// notifiers before it stay applied.
    pub fn apply(self) -> ModelResult<usize> {
        let mut applied = 0;
        for notifier in self.notifiers {
            notifier.apply()?;
            applied += 1;
        }
        Ok(applied)
    }
}

impl ClassInfo for NotifierMessage {
    const CLASS_NAME: &'static str = "NotifierMessage";
    const BASE_CLASSES: &'static [&'static str] = &["Object"];
}

impl Object for NotifierMessage {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if ar.is_reading() {
            self.notifiers = ar.read_objects("notifier", Hint::empty());
        } else {
            ar.write_objects("notifier", self.notifiers.iter_mut(), Hint::empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrival::Arrival;
    use crate::comment::Comment;
    use crate::event_parameters::EventParameters;
    use crate::origin::Origin;
    use crate::pick::Pick;
    use crate::public_object::PublicData;
    use crate::shared::Shared;
    use crate::testing;
    use crate::types::RealQuantity;
    use seisgraph_io::{BinaryArchive, XmlArchive};

    /// Runs `mutate` with notifications enabled and returns what it queued.
    fn record(mutate: impl FnOnce()) -> Vec<Notifier> {
        take_pending();
        set_enabled(true);
        mutate();
        set_enabled(false);
        take_pending()
    }

    fn summary(notifiers: &[Notifier]) -> Vec<(String, Operation, &'static str)> {
        notifiers
            .iter()
            .map(|n| {
                let class = n.object().map_or("", |o| o.class_name());
                (n.parent_id().to_string(), n.operation(), class)
            })
            .collect()
    }

    fn encode_graph(root: &Shared<EventParameters>) -> Vec<u8> {
        let mut ar = BinaryArchive::create(crate::VERSION);
        ar.write_root("", &mut *root.write());
        ar.close().unwrap()
    }

    fn decode_graph(bytes: Vec<u8>) -> Shared<EventParameters> {
        let mut ar = BinaryArchive::open(bytes).unwrap();
        let root: EventParameters = ar.read_root_as("").unwrap();
        root.register().unwrap()
    }

    fn encode_message(mut message: NotifierMessage) -> Vec<u8> {
        let mut ar = BinaryArchive::create(crate::VERSION);
        ar.write_root("", &mut message);
        ar.close().unwrap()
    }

    fn decode_message(bytes: &[u8]) -> NotifierMessage {
        let mut ar = BinaryArchive::open(bytes.to_vec()).unwrap();
        let message: NotifierMessage = ar.read_root_as("").unwrap();
        assert!(ar.success());
        message
    }

    // ------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------

    #[test]
    fn nothing_is_queued_while_disabled() {
        take_pending();
        let root = EventParameters::create("notify-off-ep").unwrap();
        root.write()
            .add_pick(Pick::create("notify-off-pick").unwrap())
            .unwrap();
        assert!(!is_enabled());
        assert!(take_pending().is_empty());
    }

    #[test]
    fn adding_a_subtree_queues_pre_order_adds() {
        let root = EventParameters::create("notify-tree-ep").unwrap();
        let origin = Origin::create("notify-tree-origin").unwrap();
        origin
            .write()
            .add_comment(Shared::new(Comment::new("c", "x")))
            .unwrap();
        origin
            .write()
            .add_arrival(Shared::new(Arrival::new("p", "P")))
            .unwrap();

        let notifiers = record(|| root.write().add_origin(origin.clone()).unwrap());
        assert_eq!(
            summary(&notifiers),
            [
                ("notify-tree-ep".to_string(), Operation::Add, "Origin"),
                ("notify-tree-origin".to_string(), Operation::Add, "Comment"),
                ("notify-tree-origin".to_string(), Operation::Add, "Arrival"),
            ]
        );
        // Each notifier carries its node only.
        let copy = notifiers[0].object().unwrap();
        let copy = seisgraph_core::cast::<Origin>(copy.as_object()).unwrap();
        assert!(copy.comments().is_empty());
        assert_eq!(copy.parent_id(), None);
    }

    #[test]
    fn capture_tree_for_removal_is_post_order() {
        let origin = Origin::create("notify-post-origin").unwrap();
        origin
            .write()
            .add_comment(Shared::new(Comment::new("c", "x")))
            .unwrap();
        let notifiers = capture_tree("notify-post-ep", &*origin.read(), Operation::Remove);
        assert_eq!(
            summary(&notifiers),
            [
                ("notify-post-origin".to_string(), Operation::Remove, "Comment"),
                ("notify-post-ep".to_string(), Operation::Remove, "Origin"),
            ]
        );
    }

    #[test]
    fn remove_and_update_queue_single_notifiers() {
        let root = EventParameters::create("notify-single-ep").unwrap();
        let pick = Pick::create("notify-single-pick").unwrap();
        pick.write()
            .add_comment(Shared::new(Comment::new("c", "x")))
            .unwrap();
        root.write().add_pick(pick.clone()).unwrap();

        let notifiers = record(|| {
            pick.write().method_id = Some("manual".into());
            emit_update(&*pick.read()).unwrap();
            root.write().remove_pick(&pick).unwrap();
        });
        assert_eq!(
            summary(&notifiers),
            [
                ("notify-single-ep".to_string(), Operation::Update, "Pick"),
                ("notify-single-ep".to_string(), Operation::Remove, "Pick"),
            ]
        );
    }

    #[test]
    fn updates_need_a_parent() {
        let pick = Pick::create("notify-detached").unwrap();
        record(|| {
            let err = emit_update(&*pick.read()).unwrap_err();
            assert!(matches!(err, ModelError::NotAttached(id) if id == "notify-detached"));
        });
        // Disabled: nothing to report.
        emit_update(&*pick.read()).unwrap();
    }

    // ------------------------------------------------------------------
    // Wire format
    // ------------------------------------------------------------------

    #[test]
    fn notifiers_carry_objects_without_children() {
        testing::setup();
        let mut pick = Pick::with_id("notify-xml-pick");
        pick.add_comment(Shared::new(Comment::new("c", "x"))).unwrap();
        let mut message = NotifierMessage::default();
        message.push(Notifier::new("notify-xml-ep", Operation::Add, Box::new(pick)));

        let mut ar = XmlArchive::create(crate::VERSION);
        ar.write_root("", &mut message);
        let bytes = ar.close().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains(
            "<notifier parentID=\"notify-xml-ep\" operation=\"add\"><Pick role=\"object\" publicID=\"notify-xml-pick\">"
        ));
        assert!(!text.contains("<comment>"));

        let mut ar = XmlArchive::open(&bytes).unwrap();
        let decoded: NotifierMessage = ar.read_root_as("").unwrap();
        let notifier = decoded.iter().next().unwrap();
        assert_eq!(notifier.operation(), Operation::Add);
        let object = notifier.object().unwrap();
        assert_eq!(object.public_id(), Some("notify-xml-pick"));
        let pick = seisgraph_core::cast::<Pick>(object.as_object()).unwrap();
        assert!(pick.comments().is_empty());
    }

    // ------------------------------------------------------------------
    // Replay
    // ------------------------------------------------------------------

    #[test]
    fn replaying_mutations_reproduces_the_graph() {
        testing::setup();
        let root = EventParameters::create("replay-ep").unwrap();
        let first = Pick::create("replay-pick-1").unwrap();
        root.write().add_pick(first.clone()).unwrap();
        let origin = Origin::create("replay-origin").unwrap();
        origin
            .write()
            .add_comment(Shared::new(Comment::new("c1", "first")))
            .unwrap();
        root.write().add_origin(origin.clone()).unwrap();
        let before = encode_graph(&root);

        let second = Pick::create("replay-pick-2").unwrap();
        second
            .write()
            .add_comment(Shared::new(Comment::new("c2", "second")))
            .unwrap();
        let notifiers = record(|| {
            root.write().add_pick(second.clone()).unwrap();
            origin
                .write()
                .add_arrival(Shared::new(Arrival::new("replay-pick-2", "S")))
                .unwrap();
            {
                let mut changed = origin.write();
                changed.latitude = RealQuantity::new(52.4);
                emit_update(&*changed).unwrap();
            }
            origin.write().remove_comment_by_index("c1").unwrap();
            root.write().remove_pick(&first).unwrap();
        });
        assert_eq!(notifiers.len(), 6);
        let after = encode_graph(&root);
        let shipped = encode_message(NotifierMessage::new(notifiers));

        drop((root, first, second, origin));
        assert!(!IdentityRegistry::contains("replay-ep"));
        assert!(!IdentityRegistry::contains("replay-pick-2"));

        let replica = decode_graph(before);
        assert_eq!(decode_message(&shipped).apply().unwrap(), 6);
        assert_eq!(encode_graph(&replica), after);

        let replica = replica.read();
        assert!(replica.pick("replay-pick-1").is_none());
        let origin = replica.origin("replay-origin").unwrap();
        assert_eq!(origin.read().latitude.value, 52.4);
        assert_eq!(origin.read().arrivals().len(), 1);
        assert!(origin.read().comments().is_empty());
    }

    #[test]
    fn replay_out_of_order_fails_without_side_effects() {
        testing::setup();
        let root = EventParameters::create("order-ep").unwrap();
        let pick = Pick::create("order-pick").unwrap();
        pick.write()
            .add_comment(Shared::new(Comment::new("c", "x")))
            .unwrap();
        let notifiers = record(|| root.write().add_pick(pick.clone()).unwrap());
        let shipped = encode_message(NotifierMessage::new(notifiers));
        drop((root, pick));

        let replica = EventParameters::create("order-ep").unwrap();
        let mut reversed = decode_message(&shipped).into_inner();
        reversed.reverse();
        let err = NotifierMessage::new(reversed).apply().unwrap_err();
        assert!(matches!(err, ModelError::ParentNotFound(id) if id == "order-pick"));
        assert!(replica.read().picks().is_empty());
        assert!(!IdentityRegistry::contains("order-pick"));

        assert_eq!(decode_message(&shipped).apply().unwrap(), 2);
        let pick = replica.read().pick("order-pick").unwrap();
        assert_eq!(pick.read().comments().len(), 1);
    }

    #[test]
    fn apply_reports_each_failure() {
        assert!(matches!(
            Notifier::default().apply(),
            Err(ModelError::EmptyNotifier)
        ));

        let stray = Notifier::new("apply-nowhere", Operation::Add, Box::new(Comment::new("c", "x")));
        assert!(matches!(stray.apply(), Err(ModelError::ParentNotFound(_))));

        let pick = Pick::create("apply-pick").unwrap();
        let update = Notifier::new("apply-pick", Operation::Update, Box::new(Comment::new("c", "x")));
        assert!(matches!(update.apply(), Err(ModelError::ChildNotFound { .. })));

        let remove = Notifier::new("apply-pick", Operation::Remove, Box::new(Comment::new("c", "x")));
        assert!(matches!(remove.apply(), Err(ModelError::ChildNotFound { .. })));

        let wrong = Notifier::new("apply-pick", Operation::Add, Box::new(Arrival::new("p", "P")));
        assert!(matches!(wrong.apply(), Err(ModelError::WrongClass { .. })));
        assert!(pick.read().comments().is_empty());
    }
}
