/*!
 * Listener Tests
 * Reply discipline, error scoping, and subscription lifecycle
 */

use fltbridge::{
    BufferHandle, ChannelError, EventCategoryId, EventSubscription, FileIoInfo, HandlerError,
    InMemoryBackend, LoopbackHub, NtStatus, SimulatedDriver, SubscriptionState,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn driver_and_hub() -> (Arc<LoopbackHub>, SimulatedDriver) {
    let hub = Arc::new(LoopbackHub::new());
    let driver = SimulatedDriver::install(&hub, Arc::new(InMemoryBackend::new()));
    (hub, driver)
}

fn wait_for_closed(subscription: &EventSubscription<FileIoInfo>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while subscription.state() != SubscriptionState::Closed {
        assert!(Instant::now() < deadline, "listener did not close in time");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn every_request_gets_exactly_one_matching_reply() {
    let (hub, driver) = driver_and_hub();
    let subscription = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PostRead,
        hub.as_ref(),
        |ctx: &mut fltbridge::ReplyContext<'_>,
         envelope: &fltbridge::MessageEnvelope<FileIoInfo>| {
            ctx.reply(NtStatus::SUCCESS, &envelope.payload)?;
            Ok(())
        },
    )
    .unwrap();

    for i in 0..5u32 {
        let reply = driver
            .inject(
                EventCategoryId::PostRead,
                100 + i,
                r"C:\data\file.txt",
                64,
                BufferHandle::NULL,
            )
            .unwrap();
        // The reply correlates with its request and echoes the payload
        assert_eq!(reply.status, NtStatus::SUCCESS);
        assert_eq!(reply.payload.process_id, 100 + i);
    }

    let stats = subscription.stats();
    assert_eq!(stats.messages_handled, 5);
    assert_eq!(stats.forced_replies, 0);
    subscription.unsubscribe();
}

#[test]
fn handler_error_forces_failure_reply_and_loop_survives() {
    let (hub, driver) = driver_and_hub();
    let subscription = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PreWrite,
        hub.as_ref(),
        |_ctx: &mut fltbridge::ReplyContext<'_>,
         envelope: &fltbridge::MessageEnvelope<FileIoInfo>| {
            if envelope.payload.process_id == 1 {
                return Err(HandlerError::Failed("simulated failure".into()));
            }
            Err(HandlerError::Failed("always failing, never replying".into()))
        },
    )
    .unwrap();

    // The kernel side still gets unblocked, with a failure status
    let reply = driver
        .inject(EventCategoryId::PreWrite, 1, r"C:\a.prot", 8, BufferHandle::NULL)
        .unwrap();
    assert_eq!(reply.status, NtStatus::UNSUCCESSFUL);

    // The loop survived and handles the next message the same way
    let reply = driver
        .inject(EventCategoryId::PreWrite, 2, r"C:\b.prot", 8, BufferHandle::NULL)
        .unwrap();
    assert_eq!(reply.status, NtStatus::UNSUCCESSFUL);

    let stats = subscription.stats();
    assert_eq!(stats.messages_handled, 2);
    assert_eq!(stats.forced_replies, 2);
    subscription.unsubscribe();
}

#[test]
fn handler_panic_forces_failure_reply() {
    let (hub, driver) = driver_and_hub();
    let subscription = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PostWrite,
        hub.as_ref(),
        |_ctx: &mut fltbridge::ReplyContext<'_>,
         _envelope: &fltbridge::MessageEnvelope<FileIoInfo>|
         -> Result<(), HandlerError> { panic!("handler blew up") },
    )
    .unwrap();

    let reply = driver
        .inject(EventCategoryId::PostWrite, 7, r"C:\c.prot", 8, BufferHandle::NULL)
        .unwrap();
    assert_eq!(reply.status, NtStatus::UNSUCCESSFUL);
    assert_eq!(subscription.state(), SubscriptionState::Listening);
    subscription.unsubscribe();
}

#[test]
fn second_reply_attempt_is_rejected() {
    let (hub, driver) = driver_and_hub();
    let subscription = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PostRead,
        hub.as_ref(),
        |ctx: &mut fltbridge::ReplyContext<'_>,
         envelope: &fltbridge::MessageEnvelope<FileIoInfo>| {
            ctx.reply(NtStatus::SUCCESS, &envelope.payload)?;
            let second = ctx.reply(NtStatus::SUCCESS, &envelope.payload);
            assert!(matches!(second, Err(ChannelError::AlreadyReplied)));
            Ok(())
        },
    )
    .unwrap();

    let reply = driver
        .inject(EventCategoryId::PostRead, 9, r"C:\d.txt", 8, BufferHandle::NULL)
        .unwrap();
    assert_eq!(reply.status, NtStatus::SUCCESS);
    subscription.unsubscribe();
}

#[test]
fn malformed_frame_is_dropped_and_listening_continues() {
    let (hub, driver) = driver_and_hub();
    let subscription = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PostRead,
        hub.as_ref(),
        |ctx: &mut fltbridge::ReplyContext<'_>,
         envelope: &fltbridge::MessageEnvelope<FileIoInfo>| {
            ctx.reply(NtStatus::SUCCESS, &envelope.payload)?;
            Ok(())
        },
    )
    .unwrap();

    // Truncated garbage: dropped without a reply, loop keeps running
    driver
        .inject_raw(
            EventCategoryId::PostRead,
            bytes::Bytes::from_static(&[0xFF; 10]),
        )
        .unwrap();

    // The next well-formed message is still processed correctly
    let reply = driver
        .inject(EventCategoryId::PostRead, 3, r"C:\ok.txt", 8, BufferHandle::NULL)
        .unwrap();
    assert_eq!(reply.status, NtStatus::SUCCESS);

    assert_eq!(subscription.state(), SubscriptionState::Listening);
    let stats = subscription.stats();
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(stats.messages_handled, 1);
    subscription.unsubscribe();
}

#[test]
fn unsubscribe_terminates_idle_listener_within_bounded_time() {
    let (hub, _driver) = driver_and_hub();
    let subscription = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PreRead,
        hub.as_ref(),
        |ctx: &mut fltbridge::ReplyContext<'_>,
         envelope: &fltbridge::MessageEnvelope<FileIoInfo>| {
            ctx.reply(NtStatus::SUCCESS, &envelope.payload)?;
            Ok(())
        },
    )
    .unwrap();

    // No message in flight; unsubscribe must still join promptly
    let started = Instant::now();
    subscription.unsubscribe();
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn driver_teardown_closes_subscription() {
    let (hub, driver) = driver_and_hub();
    let subscription = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PostRead,
        hub.as_ref(),
        |ctx: &mut fltbridge::ReplyContext<'_>,
         envelope: &fltbridge::MessageEnvelope<FileIoInfo>| {
            ctx.reply(NtStatus::SUCCESS, &envelope.payload)?;
            Ok(())
        },
    )
    .unwrap();

    driver.teardown();
    wait_for_closed(&subscription);
}

#[test]
fn subscribe_without_driver_port_fails() {
    let hub = LoopbackHub::new();
    let err = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PostRead,
        &hub,
        |ctx: &mut fltbridge::ReplyContext<'_>,
         envelope: &fltbridge::MessageEnvelope<FileIoInfo>| {
            ctx.reply(NtStatus::SUCCESS, &envelope.payload)?;
            Ok(())
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        fltbridge::subscription::SubscriptionError::ConnectionFailed(_)
    ));
}
