// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference-tracked codec for shared, possibly cyclic objects.
//!
//! A `Rc<RefCell<T>>` field writes its body once; any further encounter of
//! the same allocation in the same operation writes a back-reference to
//! the id assigned at first encounter. The writer records the id before
//! encoding the body and the reader records the freshly allocated instance
//! before populating it, which is what lets a cycle close on itself.

use super::{Activator, Codec, DefaultActivator, PartialSerializer};
use crate::buffers::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::session::SerializerSession;
use crate::wire::{FieldHeader, WireType};
use std::cell::RefCell;
use std::rc::Rc;

pub struct SharedCodec<P, A = DefaultActivator> {
    partial: P,
    activator: A,
}

impl<P> SharedCodec<P, DefaultActivator> {
    pub fn new(partial: P) -> Self {
        Self {
            partial,
            activator: DefaultActivator,
        }
    }
}

impl<P, A> SharedCodec<P, A> {
    pub fn with_activator(partial: P, activator: A) -> Self {
        Self { partial, activator }
    }
}

impl<P, A> Codec for SharedCodec<P, A>
where
    P: PartialSerializer,
    A: Activator<P::Value>,
{
    type Target = Rc<RefCell<P::Value>>;

    fn wire_type(&self) -> WireType {
        WireType::TagDelimited
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &Self::Target,
    ) -> Result<()> {
        let address = Rc::as_ptr(value) as usize;
        if let Some(id) = session.writer_refs.check(address) {
            session.writer_refs.mark_value_field();
            w.write_expected_header(field_id, WireType::Reference)?;
            return w.write_varint_u64(u64::from(id));
        }
        session.writer_refs.record(address);
        w.write_expected_header(field_id, WireType::TagDelimited)?;
        w.start_fields();
        self.partial.write_fields(w, session, &value.borrow())?;
        w.end_object()
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<Self::Target> {
        match header.wire_type {
            WireType::Reference => {
                session.reader_refs.next_field_id();
                let id = r.read_varint_u32()?;
                if id == 0 {
                    // Null only decodes through an Option codec.
                    return Err(CodecError::UnresolvedReference { id });
                }
                self.read_reference(session, id)
            }
            WireType::TagDelimited => {
                let id = session.reader_refs.next_field_id();
                let shared = Rc::new(RefCell::new(self.activator.create()));
                session
                    .reader_refs
                    .record_placeholder(id, Box::new(Rc::clone(&shared)))?;
                r.push_level();
                {
                    let mut guard = shared.borrow_mut();
                    self.partial.read_fields(r, session, &mut guard)?;
                }
                Ok(shared)
            }
            _ => Err(CodecError::UnexpectedWireType {
                expected: WireType::TagDelimited,
                found: header.wire_type,
                position: r.position(),
            }),
        }
    }

    fn read_reference(&self, session: &mut SerializerSession, id: u32) -> Result<Self::Target> {
        session.reader_refs.resolve::<Self::Target>(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::VecSink;
    use crate::codecs::scalars::VarUintCodec;
    use crate::codecs::{read_section, CodecAdapter, CodecHandle, OptionCodec};
    use crate::wire::{self, WireItem};
    use std::sync::Arc;

    // Singly linked node, cyclic when the tail points back at the head.
    #[derive(Default)]
    struct Node {
        value: u32,
        next: Option<Rc<RefCell<Node>>>,
    }

    struct NodePartial {
        next: CodecHandle<Option<Rc<RefCell<Node>>>>,
    }

    fn node_codec() -> Arc<SharedCodec<NodePartial>> {
        // The option codec needs the shared codec and vice versa; tie the
        // knot through a deferred handle the way the registry does for
        // cyclic types.
        struct Deferred {
            slot: std::sync::OnceLock<Arc<dyn crate::codecs::UntypedCodec>>,
        }
        impl crate::codecs::UntypedCodec for Deferred {
            fn wire_type(&self) -> WireType {
                WireType::TagDelimited
            }
            fn write_any(
                &self,
                w: &mut Writer<'_>,
                session: &mut SerializerSession,
                field_id: u32,
                value: &dyn std::any::Any,
            ) -> Result<()> {
                self.slot.get().expect("tied").write_any(w, session, field_id, value)
            }
            fn read_any(
                &self,
                r: &mut Reader<'_>,
                session: &mut SerializerSession,
                header: &FieldHeader,
                out: &mut dyn std::any::Any,
            ) -> Result<()> {
                self.slot.get().expect("tied").read_any(r, session, header, out)
            }
            fn read_reference_any(
                &self,
                session: &mut SerializerSession,
                id: u32,
                out: &mut dyn std::any::Any,
            ) -> Result<()> {
                self.slot
                    .get()
                    .expect("tied")
                    .read_reference_any(session, id, out)
            }
        }

        let deferred = Arc::new(Deferred {
            slot: std::sync::OnceLock::new(),
        });
        let node_handle: CodecHandle<Rc<RefCell<Node>>> =
            CodecHandle::new(deferred.clone() as Arc<dyn crate::codecs::UntypedCodec>);
        let option = OptionCodec::new(node_handle);
        let option_handle = CodecHandle::new(
            Arc::new(CodecAdapter::new(option)) as Arc<dyn crate::codecs::UntypedCodec>
        );
        let codec = Arc::new(SharedCodec::new(NodePartial {
            next: option_handle,
        }));
        let erased: Arc<dyn crate::codecs::UntypedCodec> =
            Arc::new(HandleBack(Arc::clone(&codec)));
        deferred.slot.set(erased).ok().expect("untied slot");
        codec
    }

    // Adapter over Arc so the deferred slot and the test share one codec.
    struct HandleBack(Arc<SharedCodec<NodePartial>>);
    impl crate::codecs::UntypedCodec for HandleBack {
        fn wire_type(&self) -> WireType {
            self.0.wire_type()
        }
        fn write_any(
            &self,
            w: &mut Writer<'_>,
            session: &mut SerializerSession,
            field_id: u32,
            value: &dyn std::any::Any,
        ) -> Result<()> {
            let value = value
                .downcast_ref::<Rc<RefCell<Node>>>()
                .expect("node value");
            self.0.write(w, session, field_id, value)
        }
        fn read_any(
            &self,
            r: &mut Reader<'_>,
            session: &mut SerializerSession,
            header: &FieldHeader,
            out: &mut dyn std::any::Any,
        ) -> Result<()> {
            let slot = out
                .downcast_mut::<Option<Rc<RefCell<Node>>>>()
                .expect("node slot");
            *slot = Some(self.0.read(r, session, header)?);
            Ok(())
        }
        fn read_reference_any(
            &self,
            session: &mut SerializerSession,
            id: u32,
            out: &mut dyn std::any::Any,
        ) -> Result<()> {
            let slot = out
                .downcast_mut::<Option<Rc<RefCell<Node>>>>()
                .expect("node slot");
            *slot = Some(self.0.read_reference(session, id)?);
            Ok(())
        }
    }

    impl PartialSerializer for NodePartial {
        type Value = Node;

        fn write_fields(
            &self,
            w: &mut Writer<'_>,
            session: &mut SerializerSession,
            value: &Node,
        ) -> Result<()> {
            VarUintCodec::<u32>::default().write(w, session, 0, &value.value)?;
            self.next.write(w, session, 1, &value.next)
        }

        fn read_fields(
            &self,
            r: &mut Reader<'_>,
            session: &mut SerializerSession,
            value: &mut Node,
        ) -> Result<()> {
            read_section(r, session, |r, session, header| match header.field_id {
                0 => {
                    value.value = VarUintCodec::<u32>::default().read(r, session, header)?;
                    Ok(true)
                }
                1 => {
                    value.next = self.next.read(r, session, header)?;
                    Ok(true)
                }
                _ => Ok(false),
            })?;
            Ok(())
        }
    }

    fn roundtrip(codec: &SharedCodec<NodePartial>, node: &Rc<RefCell<Node>>) -> Rc<RefCell<Node>> {
        let mut sink = VecSink::new();
        let mut session = SerializerSession::new();
        {
            let mut writer = Writer::new(&mut sink);
            codec
                .write(&mut writer, &mut session, 0, node)
                .expect("write");
        }
        let bytes = sink.into_bytes();
        let segments: [&[u8]; 1] = [&bytes];
        let mut reader = Reader::new(&segments);
        let mut read_session = SerializerSession::new();
        let header = match wire::read_item(&mut reader, &mut read_session).expect("header") {
            WireItem::Field(h) => h,
            other => panic!("unexpected item {:?}", other),
        };
        codec
            .read(&mut reader, &mut read_session, &header)
            .expect("read")
    }

    #[test]
    fn test_acyclic_chain_roundtrip() {
        let codec = node_codec();
        let tail = Rc::new(RefCell::new(Node {
            value: 2,
            next: None,
        }));
        let head = Rc::new(RefCell::new(Node {
            value: 1,
            next: Some(tail),
        }));
        let back = roundtrip(&codec, &head);
        assert_eq!(back.borrow().value, 1);
        let next = back.borrow().next.clone().expect("tail present");
        assert_eq!(next.borrow().value, 2);
        assert!(next.borrow().next.is_none());
    }

    #[test]
    fn test_cycle_closes_on_itself() {
        let codec = node_codec();
        let head = Rc::new(RefCell::new(Node {
            value: 9,
            next: None,
        }));
        head.borrow_mut().next = Some(Rc::clone(&head));

        let back = roundtrip(&codec, &head);
        let next = back.borrow().next.clone().expect("self link");
        assert!(Rc::ptr_eq(&back, &next), "cycle must close on one instance");

        // Break the decoded cycle so the Rcs can drop.
        back.borrow_mut().next = None;
        head.borrow_mut().next = None;
    }

    #[test]
    fn test_shared_tail_is_one_instance() {
        let codec = node_codec();
        let shared_tail = Rc::new(RefCell::new(Node {
            value: 5,
            next: None,
        }));
        let a = Rc::new(RefCell::new(Node {
            value: 1,
            next: Some(Rc::clone(&shared_tail)),
        }));
        let b = Rc::new(RefCell::new(Node {
            value: 2,
            next: Some(shared_tail),
        }));
        let root = Rc::new(RefCell::new(Node {
            value: 0,
            next: Some(a),
        }));
        // Walk root -> a -> tail, then serialize b -> tail in the same
        // session to confirm the tail deduplicates across subgraphs.
        let mut sink = VecSink::new();
        let mut session = SerializerSession::new();
        {
            let mut writer = Writer::new(&mut sink);
            codec
                .write(&mut writer, &mut session, 0, &root)
                .expect("write root");
            codec.write(&mut writer, &mut session, 1, &b).expect("write b");
        }
        let bytes = sink.into_bytes();
        let segments: [&[u8]; 1] = [&bytes];
        let mut reader = Reader::new(&segments);
        let mut read_session = SerializerSession::new();
        let root_header = match wire::read_item(&mut reader, &mut read_session).expect("header") {
            WireItem::Field(h) => h,
            other => panic!("unexpected item {:?}", other),
        };
        let root_back = codec
            .read(&mut reader, &mut read_session, &root_header)
            .expect("read root");
        let b_header = match wire::read_item(&mut reader, &mut read_session).expect("header") {
            WireItem::Field(h) => h,
            other => panic!("unexpected item {:?}", other),
        };
        let b_back = codec
            .read(&mut reader, &mut read_session, &b_header)
            .expect("read b");

        let a_back = root_back.borrow().next.clone().expect("a");
        let tail_via_a = a_back.borrow().next.clone().expect("tail via a");
        let tail_via_b = b_back.borrow().next.clone().expect("tail via b");
        assert!(Rc::ptr_eq(&tail_via_a, &tail_via_b));
        assert_eq!(tail_via_a.borrow().value, 5);
    }
}
