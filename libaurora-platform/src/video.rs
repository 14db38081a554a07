/// The video decoder collaborator (`video` command, spec.md §6).
pub trait VideoDecoder {
    fn start(&mut self, path: &str) -> anyhow::Result<()>;
    fn stop(&mut self);
    fn is_finished(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct NullVideoDecoder {
    finished: bool,
}

impl VideoDecoder for NullVideoDecoder {
    fn start(&mut self, _path: &str) -> anyhow::Result<()> {
        self.finished = false;
        Ok(())
    }

    fn stop(&mut self) {
        self.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
