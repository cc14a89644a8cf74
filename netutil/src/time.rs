use instant::Instant;

pub fn elapsed_seconds(since: Instant) -> f64 {
    let dt = since.elapsed();
    (dt.as_secs() as f64) + (f64::from(dt.subsec_nanos()) * 1e-9)
}

pub fn prettyprint_usize(x: usize) -> String {
    let num = format!("{}", x);
    let mut result = String::new();
    let mut i = num.len();
    for c in num.chars() {
        result.push(c);
        i -= 1;
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
    }
    result
}

pub fn prettyprint_time(seconds: f64) -> String {
    format!("{:.4}s", seconds)
}

struct TimerSpan {
    name: String,
    started_at: Instant,
}

/// Hierarchical timing of long-running steps, reported through the logger. Spans nest; each
/// `stop` logs how long its span took, indented by depth.
pub struct Timer {
    outermost_name: String,
    stack: Vec<TimerSpan>,
    results: Vec<String>,
    warnings: Vec<String>,
}

impl Timer {
    pub fn new(name: &str) -> Timer {
        let mut t = Timer {
            outermost_name: name.to_string(),
            stack: Vec::new(),
            results: Vec::new(),
            warnings: Vec::new(),
        };
        t.start(name);
        t
    }

    pub fn start(&mut self, name: &str) {
        debug!("{}...", name);
        self.stack.push(TimerSpan {
            name: name.to_string(),
            started_at: Instant::now(),
        });
    }

    pub fn stop(&mut self, name: &str) {
        let span = match self.stack.pop() {
            Some(span) => span,
            None => {
                warn!("Timer stopped {} with nothing running", name);
                return;
            }
        };
        if span.name != name {
            warn!("Timer stopped {}, but {} was running", name, span.name);
        }
        let line = format!(
            "{}- {} took {}",
            "  ".repeat(self.stack.len()),
            span.name,
            prettyprint_time(elapsed_seconds(span.started_at))
        );
        debug!("{}", line);
        self.results.push(line);
    }

    /// Remembered and repeated when the timer is dropped.
    pub fn warn(&mut self, line: String) {
        warn!("{}", line);
        self.warnings.push(line);
    }

    // Used to end the scope of a timer early.
    pub fn done(self) {}
}

impl std::ops::Drop for Timer {
    fn drop(&mut self) {
        while let Some(span) = self.stack.last() {
            let name = span.name.clone();
            self.stop(&name);
        }
        info!("{} finished", self.outermost_name);
        for line in &self.results {
            debug!("{}", line);
        }
        if !self.warnings.is_empty() {
            warn!("{} warnings during {}", self.warnings.len(), self.outermost_name);
            for line in &self.warnings {
                warn!("  {}", line);
            }
        }
    }
}
