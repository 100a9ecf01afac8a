use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use assert_fs::TempDir;
use serial_test::serial;
use toolrun_commons::is_same_path;
use toolrun_sandbox::ambient::{self, AmbientStream};
use toolrun_sandbox::cwd::is_ambient_locked;
use toolrun_sandbox::{
    Newline, RunStatus, SandboxConfig, SandboxError, ToolError, ToolRegistry, ToolRequest,
    ToolSandbox,
};

fn lf_config() -> SandboxConfig {
    SandboxConfig {
        output_newline: Newline::Lf,
        ..SandboxConfig::default()
    }
}

fn sandbox(registry: ToolRegistry) -> Result<ToolSandbox> {
    Ok(ToolSandbox::with_registry(lf_config(), registry)?)
}

#[test]
#[serial]
fn echo_module_captures_stdout() -> Result<()> {
    let temp = TempDir::new()?;
    let sandbox = sandbox(ToolRegistry::with_builtins())?;
    let result = sandbox.run_module("echo", &ToolRequest::new(["echo", "hello"], temp.path()))?;

    assert_eq!(result.stdout(), "hello\n");
    assert_eq!(result.stderr(), "");
    assert_eq!(result.status(), RunStatus::Completed);
    Ok(())
}

#[test]
#[serial]
fn ambient_state_is_restored_after_a_run() -> Result<()> {
    let temp = TempDir::new()?;
    let sandbox = sandbox(ToolRegistry::with_builtins())?;
    let before = ambient::snapshot();

    let result = sandbox.run_module("pwd", &ToolRequest::new(["pwd"], temp.path()))?;
    assert!(is_same_path(result.stdout().trim_end().as_ref(), temp.path()));

    assert_eq!(ambient::snapshot(), before);
    assert!(!is_ambient_locked());
    Ok(())
}

#[test]
#[serial]
fn ambient_state_is_restored_after_a_panic() -> Result<()> {
    let temp = TempDir::new()?;
    let registry = ToolRegistry::new().with("explode", || {
        write!(ambient::stdout(), "before the panic")?;
        panic!("tool crashed");
    });
    let sandbox = sandbox(registry)?;
    let before = ambient::snapshot();

    let request = ToolRequest::new(["explode", "--now"], temp.path()).with_stdin("ignored");
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| sandbox.run_module("explode", &request)));
    assert!(outcome.is_err());

    assert_eq!(ambient::snapshot(), before);
    assert!(!is_ambient_locked());

    // The lock is usable again from this thread.
    let retry = sandbox.run_api(|_, _, _, _| Ok(()), &ToolRequest::new(["noop"], temp.path()))?;
    assert!(retry.success());
    Ok(())
}

#[test]
#[serial]
fn voluntary_exit_keeps_partial_output() -> Result<()> {
    let temp = TempDir::new()?;
    let registry = ToolRegistry::new().with("partial", || {
        write!(ambient::stdout(), "partial")?;
        Err(ToolError::exit(0))
    });
    let sandbox = sandbox(registry)?;

    let result = sandbox.run_module("partial", &ToolRequest::new(["partial"], temp.path()))?;
    assert_eq!(result.stdout(), "partial");
    assert_eq!(result.stderr(), "");
    assert_eq!(result.status(), RunStatus::Stopped { code: 0 });
    assert!(result.success());
    Ok(())
}

#[test]
#[serial]
fn nonzero_voluntary_exit_reports_code_and_stderr() -> Result<()> {
    let temp = TempDir::new()?;
    let sandbox = sandbox(ToolRegistry::with_builtins())?;

    let request = ToolRequest::new(["fail", "bad", "input"], temp.path());
    let result = sandbox.run_module("fail", &request)?;
    assert_eq!(result.stdout(), "");
    assert_eq!(result.stderr(), "bad input\n");
    assert_eq!(result.status(), RunStatus::Stopped { code: 1 });
    assert!(!result.success());
    Ok(())
}

#[test]
#[serial]
fn stdin_is_fed_from_the_request() -> Result<()> {
    let temp = TempDir::new()?;
    let sandbox = sandbox(ToolRegistry::with_builtins())?;

    let request = ToolRequest::new(["cat"], temp.path()).with_stdin("42\n");
    let result = sandbox.run_module("cat", &request)?;
    assert_eq!(result.stdout(), "42\n");
    Ok(())
}

#[test]
#[serial]
fn stdin_left_alone_without_input() -> Result<()> {
    let temp = TempDir::new()?;
    let sandbox = sandbox(ToolRegistry::new())?;

    let request = ToolRequest::new(["check"], temp.path()).stdin_enabled(true);
    let result = sandbox.run_api(
        |_, _, _, stdin| {
            assert!(stdin.is_none());
            assert!(ambient::stream_slot(AmbientStream::Stdin).is_inherited());
            Ok(())
        },
        &request,
    )?;
    assert!(result.success());
    Ok(())
}

#[test]
#[serial]
fn unknown_module_is_reported_before_locking() -> Result<()> {
    let temp = TempDir::new()?;
    let sandbox = sandbox(ToolRegistry::with_builtins())?;

    let err = sandbox
        .run_module("flake8", &ToolRequest::new(["flake8"], temp.path()))
        .err();
    assert!(matches!(err, Some(SandboxError::ModuleNotFound { ref id }) if id == "flake8"));
    Ok(())
}

#[test]
#[serial]
fn tool_failure_propagates_after_restore() -> Result<()> {
    let temp = TempDir::new()?;
    let registry = ToolRegistry::new().with("broken", || Err(ToolError::failure("config missing")));
    let sandbox = sandbox(registry)?;
    let before = ambient::snapshot();

    let err = sandbox
        .run_module("broken", &ToolRequest::new(["broken"], temp.path()))
        .err();
    match err {
        Some(SandboxError::ToolFailed { tool, source }) => {
            assert_eq!(tool, "broken");
            assert!(!source.is_exit());
            assert_eq!(source.to_string(), "config missing");
        }
        other => panic!("expected ToolFailed, got {other:?}"),
    }
    assert_eq!(ambient::snapshot(), before);
    Ok(())
}

#[test]
#[serial]
fn missing_working_directory_is_an_error() -> Result<()> {
    let temp = TempDir::new()?;
    let sandbox = sandbox(ToolRegistry::with_builtins())?;
    let before = ambient::snapshot();

    let request = ToolRequest::new(["echo"], temp.path().join("gone"));
    let err = sandbox.run_module("echo", &request).err();
    assert!(matches!(err, Some(SandboxError::WorkingDirectory { .. })));
    assert_eq!(ambient::snapshot(), before);
    assert!(!is_ambient_locked());
    Ok(())
}

#[test]
#[serial]
fn current_directory_runs_in_place() -> Result<()> {
    let sandbox = sandbox(ToolRegistry::with_builtins())?;
    let current = std::env::current_dir()?;

    let result = sandbox.run_module("pwd", &ToolRequest::new(["pwd"], &current))?;
    assert!(is_same_path(result.stdout().trim_end().as_ref(), &current));
    assert_eq!(std::env::current_dir()?, current);
    Ok(())
}

#[test]
#[serial]
fn tool_changing_directory_in_place_is_undone() -> Result<()> {
    let elsewhere = TempDir::new()?;
    let target = elsewhere.path().to_path_buf();
    let registry = ToolRegistry::new().with("wander", move || {
        std::env::set_current_dir(&target)?;
        Ok(())
    });
    let sandbox = sandbox(registry)?;
    let before = ambient::snapshot();
    let current = std::env::current_dir()?;

    let result = sandbox.run_module("wander", &ToolRequest::new(["wander"], &current))?;
    assert!(result.success());
    assert_eq!(ambient::snapshot(), before);
    Ok(())
}

#[test]
#[serial]
fn api_callback_sees_the_installed_buffers() -> Result<()> {
    let temp = TempDir::new()?;
    let sandbox = sandbox(ToolRegistry::new())?;

    let request = ToolRequest::new(["black", "-"], temp.path()).with_stdin("x=1\n");
    let result = sandbox.run_api(
        |argv, stdout, stderr, stdin| {
            assert_eq!(argv, ["black".to_string(), "-".to_string()]);
            assert_eq!(ambient::args(), argv);

            let installed = ambient::stream_slot(AmbientStream::Stdout);
            assert!(installed.captured().is_some_and(|stream| stream.same_stream(stdout)));
            let installed = ambient::stream_slot(AmbientStream::Stderr);
            assert!(installed.captured().is_some_and(|stream| stream.same_stream(stderr)));

            let source = stdin.map(|stream| stream.read_text()).unwrap_or_default();
            stdout.write_str(&source.replace('=', " = "));
            writeln!(ambient::stderr(), "1 file reformatted")?;
            Ok(())
        },
        &request,
    )?;

    assert_eq!(result.stdout(), "x = 1\n");
    assert_eq!(result.stderr(), "1 file reformatted\n");
    Ok(())
}

#[test]
#[serial]
fn nested_in_process_run_is_rejected() -> Result<()> {
    let temp = TempDir::new()?;
    let sandbox = sandbox(ToolRegistry::with_builtins())?;
    let inner = sandbox.clone();
    let request = ToolRequest::new(["outer"], temp.path());

    let result = sandbox.run_api(
        |_, stdout, _, _| {
            let nested_request = ToolRequest::new(["echo", "inner"], temp.path());
            let nested = inner.run_module("echo", &nested_request);
            assert!(matches!(nested, Err(SandboxError::Reentrant)));
            stdout.write_str("outer done");
            Ok(())
        },
        &request,
    )?;
    assert_eq!(result.stdout(), "outer done");
    Ok(())
}

#[test]
#[serial]
fn in_process_runs_are_mutually_exclusive() -> Result<()> {
    const THREADS: usize = 8;

    let sandbox = Arc::new(sandbox(ToolRegistry::new())?);
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let dirs = (0..THREADS)
        .map(|_| TempDir::new())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    thread::scope(|scope| {
        let handles: Vec<_> = dirs
            .iter()
            .map(|dir| {
                let sandbox = Arc::clone(&sandbox);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                scope.spawn(move || {
                    let request = ToolRequest::new(["worker"], dir.path());
                    sandbox.run_api(
                        |_, stdout, _, _| {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(10));
                            let cwd = std::env::current_dir()?;
                            stdout.write_str(&cwd.display().to_string());
                            active.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        },
                        &request,
                    )
                })
            })
            .collect();

        for (handle, dir) in handles.into_iter().zip(&dirs) {
            let result = handle.join().map_err(|_| anyhow::anyhow!("worker panicked"))??;
            assert!(is_same_path(result.stdout().as_ref(), dir.path()));
        }
        Ok::<(), anyhow::Error>(())
    })?;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(!is_ambient_locked());
    Ok(())
}
