use super::{types::*, Engine};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PDF_EXTRACT_SCRIPT: &str = "pdf_extract.py";

/// Subprocess-backed engine: pandoc and ocrmypdf are invoked as argv tools,
/// the PDF extraction library runs inside a worker process spawned per job
/// (the library holds an internal lock, so each job owns its own process).
pub struct ShellEngine {
    cfg: Config,
    scripts_dir: PathBuf,
    python_exe: PathBuf,
}

impl ShellEngine {
    pub fn new(cfg: &Config) -> Result<Self> {
        let scripts_dir = PathBuf::from(&cfg.paths.scripts_dir);
        if cfg.security.pin_scripts_dir {
            let cwd = std::env::current_dir().with_context(|| "current_dir")?;
            let canon = scripts_dir
                .canonicalize()
                .with_context(|| format!("canonicalize scripts_dir: {}", scripts_dir.display()))?;
            if !canon.starts_with(&cwd) {
                return Err(anyhow!(
                    "scripts_dir is outside cwd while pin_scripts_dir=true: {}",
                    canon.display()
                ));
            }
        }
        let script = scripts_dir.join(PDF_EXTRACT_SCRIPT);
        if !script.exists() {
            return Err(anyhow!("missing script: {}", script.display()));
        }
        let python_exe = resolve_python_exe(&cfg.pdf.python_exe);
        Ok(Self {
            cfg: cfg.clone(),
            scripts_dir,
            python_exe,
        })
    }

    fn script(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(name)
    }

    /// One worker process per call: serialize the request to stdin, parse the
    /// JSON reply from stdout.
    fn run_worker<I: serde::Serialize, O: for<'de> serde::Deserialize<'de>>(
        &self,
        script: &Path,
        input: &I,
        timeout_seconds: Option<u64>,
    ) -> Result<O> {
        debug!(
            "worker run {} timeout={:?}",
            script.display(),
            timeout_seconds
        );
        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(script);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        for (k, v) in &self.cfg.pdf.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning worker: {}", script.display()))?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            let bytes = serde_json::to_vec(input)?;
            use std::io::Write;
            stdin.write_all(&bytes)?;
            stdin.flush().ok();
        }

        let output = if let Some(secs) = timeout_seconds {
            wait_with_timeout(&mut child, Duration::from_secs(secs))?
        } else {
            child
                .wait_with_output()
                .with_context(|| "waiting for worker")?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "worker failed: {}\n{}",
                script.display(),
                stderr
            ));
        }

        if self.cfg.debug.keep_tool_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("worker stderr {}: {}", script.display(), stderr.trim());
        }

        let out: O = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing worker JSON output: {}", script.display()))?;
        Ok(out)
    }

    /// argv tools (pandoc, ocrmypdf): no stdin protocol, success is exit 0.
    fn run_argv(&self, binary: &str, args: &[String], timeout_seconds: u64) -> Result<Output> {
        debug!("exec {} {:?} timeout={}s", binary, args, timeout_seconds);
        let mut cmd = Command::new(binary);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {binary} (is it installed?)"))?;

        let output = if timeout_seconds > 0 {
            wait_with_timeout(&mut child, Duration::from_secs(timeout_seconds))?
        } else {
            child
                .wait_with_output()
                .with_context(|| format!("waiting for {binary}"))?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("{binary} failed: {}", stderr.trim()));
        }

        if self.cfg.debug.keep_tool_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("{binary} stderr: {}", stderr.trim());
        }

        Ok(output)
    }

    fn probe_version(&self, binary: &str) -> ToolStatus {
        match self.run_argv(binary, &["--version".to_string()], 30) {
            Ok(out) => {
                let text = String::from_utf8_lossy(&out.stdout);
                let version = text.lines().next().map(|l| l.trim().to_string());
                ToolStatus {
                    ok: true,
                    version,
                    error: None,
                }
            }
            Err(e) => ToolStatus {
                ok: false,
                version: None,
                error: Some(format!("{e:#}")),
            },
        }
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("DOC_CONVOY_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

impl Engine for ShellEngine {
    fn doctor(&self) -> Result<EngineDiag> {
        let pandoc = self.probe_version(&self.cfg.pandoc.binary);
        let ocr = self.probe_version(&self.cfg.ocr.binary);

        let script = self.script(PDF_EXTRACT_SCRIPT);
        let pdf_worker = match self.run_worker::<serde_json::Value, PdfExtractOut>(
            &script,
            &serde_json::json!({"cmd": "doctor"}),
            Some(60),
        ) {
            Ok(out) if out.ok => ToolStatus {
                ok: true,
                version: None,
                error: None,
            },
            Ok(out) => ToolStatus {
                ok: false,
                version: None,
                error: out.error,
            },
            Err(e) => ToolStatus {
                ok: false,
                version: None,
                error: Some(format!("{e:#}")),
            },
        };

        Ok(EngineDiag {
            pandoc,
            pdf_worker,
            ocr,
        })
    }

    fn extract_pdf(&self, req: &PdfExtractIn) -> Result<PdfExtractOut> {
        let script = self.script(PDF_EXTRACT_SCRIPT);
        let timeout = if self.cfg.pdf.timeout_seconds > 0 {
            Some(self.cfg.pdf.timeout_seconds)
        } else {
            None
        };
        let out: PdfExtractOut = self.run_worker(
            &script,
            &serde_json::json!({"cmd": "extract", "req": req}),
            timeout,
        )?;
        if !out.ok {
            warn!("pdf extract returned ok=false for {}", req.input_pdf);
        }
        Ok(out)
    }

    fn pandoc_convert(&self, input: &Path, output: &Path, to: &str) -> Result<()> {
        let mut args = Vec::new();
        args.push(input.display().to_string());
        args.push("--to".to_string());
        args.push(to.to_string());
        args.push("-o".to_string());
        args.push(output.display().to_string());
        args.extend(self.cfg.pandoc.extra_args.iter().cloned());

        self.run_argv(&self.cfg.pandoc.binary, &args, self.cfg.pandoc.timeout_seconds)
            .with_context(|| format!("pandoc: {} -> {}", input.display(), output.display()))?;
        Ok(())
    }

    fn ocr_pdf(&self, req: &OcrIn) -> Result<()> {
        let mut args = Vec::new();
        if !req.langs.is_empty() {
            args.push("--language".to_string());
            args.push(req.langs.join("+"));
        }
        args.extend(self.cfg.ocr.extra_args.iter().cloned());
        if req.fast {
            args.extend(self.cfg.ocr.fast_extra_args.iter().cloned());
        }
        args.push(req.input_pdf.clone());
        args.push(req.output_pdf.clone());

        self.run_argv(&self.cfg.ocr.binary, &args, self.cfg.ocr.timeout_seconds)
            .with_context(|| format!("ocr: {} -> {}", req.input_pdf, req.output_pdf))?;
        Ok(())
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so a verbose child can't deadlock on a full
    // stdout/stderr buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("child process timed out after {:?}", timeout);
            let _ = child.kill();
            let status = child.wait().with_context(|| "wait after kill")?;
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            let output = Output {
                status,
                stdout,
                stderr,
            };
            return Err(anyhow!(
                "child process exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
