/*!
 * fltbridge Client - Main Entry Point
 *
 * Test client for the event-interception driver:
 * - loads the driver as a minifilter
 * - subscribes to post-read and pre-write interception events
 * - inspects protected buffers through the memory bridge
 * - replies so each intercepted operation can proceed
 */

use anyhow::Context;
use fltbridge::{
    init_tracing, BufferHandle, ClientConfig, DriverLoader, EventCategoryId, EventSubscription,
    FileIoInfo, FilterPolicy, HandlerError, MemoryBridge, MessageEnvelope, NtStatus, ReplyContext,
};
use std::sync::Arc;
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("fltbridge client starting");
    let config = ClientConfig::from_env();

    let loader = DriverLoader::new();
    if loader.load_as_filter(&config.driver_image, &config.altitude) {
        run_callbacks(&loader, &config)?;
        loader.unload();
    } else {
        error!("unable to load driver");
    }

    println!("Press Enter to exit...");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
    Ok(())
}

fn run_callbacks(loader: &DriverLoader, config: &ClientConfig) -> anyhow::Result<()> {
    let driver = loader.driver().context("driver not loaded")?;
    let policy = config.policy();
    let backend: Arc<dyn fltbridge::MdlBackend> = driver.backend().clone();
    let bridge = MemoryBridge::new(backend);

    let read_filter = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PostRead,
        loader.hub().as_ref(),
        inspect_handler("READ", policy.clone(), bridge.clone()),
    );
    // A failed subscription is reported but does not abort the client
    let read_filter = match read_filter {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            error!(error = %e, "callbacks failure");
            None
        }
    };

    let write_filter = EventSubscription::<FileIoInfo>::subscribe(
        EventCategoryId::PreWrite,
        loader.hub().as_ref(),
        inspect_handler("WRITE", policy, bridge),
    );
    let write_filter = match write_filter {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            error!(error = %e, "callbacks failure");
            None
        }
    };

    // Sample traffic through the simulated driver
    let pid = std::process::id();
    if read_filter.is_some() {
        let buffer = driver.register_buffer(pid, b"HELLO".to_vec());
        let reply = driver
            .inject(EventCategoryId::PostRead, pid, r"C:\data\secret.prot", 128, buffer)
            .context("post-read injection")?;
        info!(status = %reply.status, "post-read on a protected file acknowledged");

        let reply = driver
            .inject(
                EventCategoryId::PostRead,
                pid,
                r"C:\data\notes.txt",
                128,
                BufferHandle::NULL,
            )
            .context("post-read injection")?;
        info!(status = %reply.status, "post-read on an unrelated file acknowledged");
    }
    if write_filter.is_some() {
        let buffer = driver.register_buffer(pid, b"JOURNAL".to_vec());
        let reply = driver
            .inject(EventCategoryId::PreWrite, pid, r"C:\data\journal.prot", 64, buffer)
            .context("pre-write injection")?;
        info!(status = %reply.status, "pre-write on a protected file acknowledged");
    }

    for subscription in [read_filter, write_filter].into_iter().flatten() {
        let category = subscription.category();
        if let Ok(stats) = serde_json::to_string(&subscription.stats()) {
            info!(%category, stats = %stats, "subscription finished");
        }
        subscription.unsubscribe();
    }
    Ok(())
}

/// Policy-gated inspection handler: map, read, unmap, reply success.
///
/// Mapping failures are logged and the operation is still acknowledged; a
/// mapping problem is never a reason to stall the intercepted I/O.
fn inspect_handler(
    tag: &'static str,
    policy: FilterPolicy,
    bridge: MemoryBridge,
) -> impl Fn(&mut ReplyContext<'_>, &MessageEnvelope<FileIoInfo>) -> Result<(), HandlerError>
       + Send
       + 'static {
    move |ctx, envelope| {
        let info = &envelope.payload;
        let path = info.path();
        if policy.should_inspect(&path, info.size as usize) && !info.buffer_handle.is_null() {
            match bridge.map(info.buffer_handle, info.process_id, 0) {
                Ok(mapping) => {
                    info!(
                        "[{tag}]: {} -> {:?}",
                        path,
                        String::from_utf8_lossy(mapping.bytes())
                    );
                    if let Err(e) = bridge.unmap(mapping) {
                        warn!(error = %e, "[{tag}]: unmap failed");
                    }
                }
                Err(e) => warn!(error = %e, "[{tag}]: mapping failed"),
            }
        }
        ctx.reply(NtStatus::SUCCESS, info)?;
        Ok(())
    }
}
