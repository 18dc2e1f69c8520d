/*!
 * Scenario Tests
 * End-to-end interception flows: policy gate, mapping bridge, reply
 */

use fltbridge::bridge::{MapResult, MappedRegion};
use fltbridge::{
    BufferHandle, EventCategoryId, EventSubscription, FileIoInfo, FilterPolicy, HandlerError,
    InMemoryBackend, LoopbackHub, MdlBackend, MemoryBridge, MessageEnvelope, NtStatus,
    ReplyContext, SimulatedDriver,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Backend wrapper counting `map` calls, to prove the policy gate short-circuits
struct CountingBackend {
    inner: Arc<InMemoryBackend>,
    maps: AtomicUsize,
}

impl MdlBackend for CountingBackend {
    fn map(&self, handle: BufferHandle, owner: u32, offset: usize) -> MapResult<MappedRegion> {
        self.maps.fetch_add(1, Ordering::Relaxed);
        self.inner.map(handle, owner, offset)
    }

    fn unmap(&self, handle: BufferHandle, base: usize) -> MapResult<()> {
        self.inner.unmap(handle, base)
    }
}

struct Fixture {
    driver: SimulatedDriver,
    subscription: EventSubscription<FileIoInfo>,
    backend: Arc<CountingBackend>,
    bridge: MemoryBridge,
    inspected: Arc<Mutex<Vec<Vec<u8>>>>,
}

fn fixture(category: EventCategoryId) -> Fixture {
    let hub = Arc::new(LoopbackHub::new());
    let inner = Arc::new(InMemoryBackend::new());
    let driver = SimulatedDriver::install(&hub, Arc::clone(&inner));

    let backend = Arc::new(CountingBackend {
        inner,
        maps: AtomicUsize::new(0),
    });
    let bridge = MemoryBridge::new(Arc::clone(&backend) as Arc<dyn MdlBackend>);
    let inspected: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));

    let policy = FilterPolicy::default();
    let handler = {
        let bridge = bridge.clone();
        let inspected = Arc::clone(&inspected);
        move |ctx: &mut ReplyContext<'_>,
              envelope: &MessageEnvelope<FileIoInfo>|
              -> Result<(), HandlerError> {
            let info = &envelope.payload;
            if policy.should_inspect(&info.path(), info.size as usize)
                && !info.buffer_handle.is_null()
            {
                let mapping = bridge.map(info.buffer_handle, info.process_id, 0)?;
                inspected.lock().push(mapping.bytes().to_vec());
                bridge.unmap(mapping)?;
            }
            ctx.reply(NtStatus::SUCCESS, info)?;
            Ok(())
        }
    };

    let subscription =
        EventSubscription::<FileIoInfo>::subscribe(category, hub.as_ref(), handler).unwrap();
    Fixture {
        driver,
        subscription,
        backend,
        bridge,
        inspected,
    }
}

#[test]
fn protected_read_is_mapped_inspected_and_acknowledged() {
    let f = fixture(EventCategoryId::PostRead);
    let handle = f.driver.register_buffer(1000, b"HELLO".to_vec());

    let reply = f
        .driver
        .inject(EventCategoryId::PostRead, 1000, r"C:\data\secret.prot", 128, handle)
        .unwrap();

    assert_eq!(reply.status, NtStatus::SUCCESS);
    assert_eq!(*f.inspected.lock(), vec![b"HELLO".to_vec()]);
    assert_eq!(f.backend.maps.load(Ordering::Relaxed), 1);
    // Unmapped before the reply went out; nothing is left active
    assert_eq!(f.bridge.active_mappings(), 0);
    f.subscription.unsubscribe();
}

#[test]
fn unrelated_file_replies_without_mapping() {
    let f = fixture(EventCategoryId::PostRead);
    let handle = f.driver.register_buffer(1000, b"HELLO".to_vec());

    let reply = f
        .driver
        .inject(EventCategoryId::PostRead, 1000, r"C:\data\file.txt", 128, handle)
        .unwrap();

    assert_eq!(reply.status, NtStatus::SUCCESS);
    assert!(f.inspected.lock().is_empty());
    assert_eq!(f.backend.maps.load(Ordering::Relaxed), 0);
    f.subscription.unsubscribe();
}

#[test]
fn zero_size_transfer_is_never_inspected() {
    let f = fixture(EventCategoryId::PreWrite);
    let handle = f.driver.register_buffer(1000, b"HELLO".to_vec());

    let reply = f
        .driver
        .inject(EventCategoryId::PreWrite, 1000, r"C:\data\secret.prot", 0, handle)
        .unwrap();

    assert_eq!(reply.status, NtStatus::SUCCESS);
    assert_eq!(f.backend.maps.load(Ordering::Relaxed), 0);
    f.subscription.unsubscribe();
}

#[test]
fn oversized_transfer_is_never_inspected() {
    let f = fixture(EventCategoryId::PreWrite);
    let handle = f.driver.register_buffer(1000, vec![0u8; 8192]);

    let reply = f
        .driver
        .inject(EventCategoryId::PreWrite, 1000, r"C:\data\secret.prot", 8192, handle)
        .unwrap();

    assert_eq!(reply.status, NtStatus::SUCCESS);
    assert_eq!(f.backend.maps.load(Ordering::Relaxed), 0);
    f.subscription.unsubscribe();
}

#[test]
fn null_buffer_handle_skips_mapping() {
    let f = fixture(EventCategoryId::PostRead);

    let reply = f
        .driver
        .inject(
            EventCategoryId::PostRead,
            1000,
            r"C:\data\secret.prot",
            128,
            BufferHandle::NULL,
        )
        .unwrap();

    assert_eq!(reply.status, NtStatus::SUCCESS);
    assert_eq!(f.backend.maps.load(Ordering::Relaxed), 0);
    f.subscription.unsubscribe();
}

#[test]
fn mapping_failure_still_produces_a_reply() {
    let f = fixture(EventCategoryId::PostRead);
    // Handle was never described to the backend
    let bogus = BufferHandle::from_raw(0xBAAD);

    let reply = f
        .driver
        .inject(EventCategoryId::PostRead, 1000, r"C:\data\secret.prot", 128, bogus)
        .unwrap();

    // The handler's `?` surfaced the MapError; the loop forced the reply
    assert_eq!(reply.status, NtStatus::UNSUCCESSFUL);
    assert_eq!(f.subscription.stats().forced_replies, 1);
    f.subscription.unsubscribe();
}

#[test]
fn concurrent_subscriptions_do_not_interfere() {
    let hub = Arc::new(LoopbackHub::new());
    let inner = Arc::new(InMemoryBackend::new());
    let driver = Arc::new(SimulatedDriver::install(&hub, Arc::clone(&inner)));
    let bridge = MemoryBridge::new(Arc::clone(&inner) as Arc<dyn MdlBackend>);

    let make_handler = |bridge: MemoryBridge| {
        move |ctx: &mut ReplyContext<'_>,
              envelope: &MessageEnvelope<FileIoInfo>|
              -> Result<(), HandlerError> {
            let info = &envelope.payload;
            if !info.buffer_handle.is_null() {
                let mapping = bridge.map(info.buffer_handle, info.process_id, 0)?;
                bridge.unmap(mapping)?;
            }
            ctx.reply(NtStatus::SUCCESS, info)?;
            Ok(())
        }
    };

    let read = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PostRead,
        hub.as_ref(),
        make_handler(bridge.clone()),
    )
    .unwrap();
    let write = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PreWrite,
        hub.as_ref(),
        make_handler(bridge.clone()),
    )
    .unwrap();

    let mut workers = Vec::new();
    for (category, pid) in [
        (EventCategoryId::PostRead, 1u32),
        (EventCategoryId::PreWrite, 2u32),
    ] {
        let driver = Arc::clone(&driver);
        workers.push(std::thread::spawn(move || {
            for _ in 0..20 {
                let handle = driver.register_buffer(pid, b"DATA".to_vec());
                let reply = driver
                    .inject(category, pid, r"C:\data\secret.prot", 4, handle)
                    .unwrap();
                assert_eq!(reply.status, NtStatus::SUCCESS);
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(bridge.active_mappings(), 0);
    read.unsubscribe();
    write.unsubscribe();
}
