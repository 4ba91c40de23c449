use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use log::debug;
use once_cell::sync::OnceCell;
use tokio::{
    runtime::{Builder, Handle, Runtime},
    sync::oneshot,
};

use crate::models::scenario::ExecutionContext;

pub const MAIN_THREAD_NAME: &str = "main-loop";
pub const POOL_THREAD_PREFIX: &str = "default-worker";
pub const GLOBAL_THREAD_PREFIX: &str = "global-worker";

static GLOBAL_RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// The runtimes tasks can be sent to. `Main` and `Pool` belong to this
/// session and go away with it; `Global` is shared by the whole process.
pub struct ExecutionContexts {
    handles: ContextHandles,
    pool: Option<Runtime>,
    main: MainLoop,
}

/// Cheap, cloneable spawn handles for each context.
#[derive(Debug, Clone)]
pub struct ContextHandles {
    main: Handle,
    pool: Handle,
    global: Handle,
}

impl ContextHandles {
    pub fn get(&self, context: ExecutionContext) -> &Handle {
        match context {
            ExecutionContext::Main => &self.main,
            ExecutionContext::Pool => &self.pool,
            ExecutionContext::Global => &self.global,
        }
    }
}

impl ExecutionContexts {
    pub fn new(pool_threads: usize, global_threads: usize) -> io::Result<Self> {
        let main = MainLoop::spawn()?;
        let pool = Builder::new_multi_thread()
            .worker_threads(pool_threads)
            .thread_name_fn(numbered(POOL_THREAD_PREFIX))
            .enable_time()
            .build()?;
        let handles = ContextHandles {
            main: main.handle.clone(),
            pool: pool.handle().clone(),
            global: global_runtime(global_threads)?.handle().clone(),
        };
        debug!("Execution contexts ready: pool={}, global={}", pool_threads, global_threads);

        Ok(Self {
            handles,
            pool: Some(pool),
            main,
        })
    }

    pub fn handles(&self) -> &ContextHandles {
        &self.handles
    }

    pub fn handle(&self, context: ExecutionContext) -> &Handle {
        self.handles.get(context)
    }
}

impl Drop for ExecutionContexts {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown_background();
        }
        debug!("Session pool shut down");
    }
}

/// A current-thread runtime driven on its own named thread. Dropping it
/// signals the thread to stop but does not wait: a task busy with heavy work
/// holds the thread until it returns, and the thread exits after that.
struct MainLoop {
    handle: Handle,
    stop: Option<oneshot::Sender<()>>,
}

impl MainLoop {
    fn spawn() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_time().build()?;
        let handle = runtime.handle().clone();
        let (stop, stopped) = oneshot::channel::<()>();

        thread::Builder::new()
            .name(MAIN_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(async {
                    let _ = stopped.await;
                });
                runtime.shutdown_background();
                debug!("Main loop stopped");
            })?;

        Ok(Self {
            handle,
            stop: Some(stop),
        })
    }
}

impl Drop for MainLoop {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

fn global_runtime(threads: usize) -> io::Result<&'static Runtime> {
    GLOBAL_RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name_fn(numbered(GLOBAL_THREAD_PREFIX))
            .enable_time()
            .build()
    })
}

fn numbered(prefix: &'static str) -> impl Fn() -> String + Send + Sync + 'static {
    let next = AtomicUsize::new(1);
    move || format!("{}-{}", prefix, next.fetch_add(1, Ordering::Relaxed))
}

/// Name of the calling thread, with the OS thread id where available.
pub fn current_thread_label() -> String {
    let current = thread::current();
    let name = current
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{:?}", current.id()));
    match os_thread_id() {
        Some(tid) => format!("{} (tid {})", name, tid),
        None => name,
    }
}

#[cfg(target_os = "linux")]
fn os_thread_id() -> Option<i64> {
    // SAFETY: gettid takes no arguments and cannot fail.
    let tid = unsafe { libc::syscall(libc::SYS_gettid) };
    Some(tid as i64)
}

#[cfg(not(target_os = "linux"))]
fn os_thread_id() -> Option<i64> {
    None
}
