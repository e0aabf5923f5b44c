/// Turns a count of finished steps into de-duplicated percentages.
pub struct PercentProgress<'a> {
    callback: &'a mut dyn FnMut(u8),
    total: usize,
    done: usize,
    last: Option<u8>,
}

impl<'a> PercentProgress<'a> {
    /// Tracks `total` steps; zero steps reports 0 then 100.
    pub fn new(callback: &'a mut dyn FnMut(u8), total: usize) -> Self {
        Self {
            callback,
            total,
            done: 0,
            last: None,
        }
    }

    /// Reports 0%.
    pub fn start(&mut self) {
        self.emit(0);
    }

    /// Marks one step finished.
    pub fn advance(&mut self) {
        self.done = (self.done + 1).min(self.total);
        let percent = if self.total == 0 {
            100
        } else {
            // done <= total, so the result fits in a u8
            u8::try_from(self.done * 100 / self.total).unwrap_or(100)
        };
        self.emit(percent);
    }

    /// Reports 100% if it was not reported yet.
    pub fn finish(&mut self) {
        self.emit(100);
    }

    fn emit(&mut self, percent: u8) {
        if self.last != Some(percent) {
            self.last = Some(percent);
            (self.callback)(percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_each_percentage_once() {
        let mut seen = Vec::new();
        let mut record = |pct: u8| seen.push(pct);
        let mut progress = PercentProgress::new(&mut record, 4);

        progress.start();
        for _ in 0..4 {
            progress.advance();
        }
        progress.finish();

        assert_eq!(seen, vec![0, 25, 50, 75, 100]);
    }

    #[test]
    fn test_empty_work_still_reports_bounds() {
        let mut seen = Vec::new();
        let mut record = |pct: u8| seen.push(pct);
        let mut progress = PercentProgress::new(&mut record, 0);

        progress.start();
        progress.finish();

        assert_eq!(seen, vec![0, 100]);
    }
}
