//! Wires every component into one instantiable value and runs the
//! frame-tick data flow of spec.md §2.

use crate::callstack::CallStack;
use crate::dialogue::controller::{DialogueController, DialogueEvent};
use crate::effect::EffectState;
use crate::error::{fatal, CollectingErrorSink};
use crate::log::LogState;
use crate::property::TweenTable;
use crate::save;
use crate::scheduler::action::{ActionKind, EventMode};
use crate::scheduler::Scheduler;
use crate::script::buffer::ScriptBuffer;
use crate::script::label::LabelTable;
use crate::script::lexer::Lexer;
use crate::skip::SkipState;
use crate::sprite::SpriteTables;
use crate::vars::VariableStore;
use anyhow::{Context, Result as AResult};
use libaurora_platform::audio::ChannelId;
use libaurora_platform::{AudioMixer, Compositor};
use libcommon::ScriptAddress;
use std::path::PathBuf;

/// The one value that carries every table §3 describes. Presentation
/// (compositor/audio/video) is injected as trait objects so the engine is
/// testable against the narrow in-memory doubles in `libaurora-platform`.
pub struct Engine {
    pub script: ScriptBuffer,
    pub labels: LabelTable,
    pub vars: VariableStore,
    pub callstack: CallStack,
    pub lexer: Lexer,
    pub current_line: u32,
    pub dialogue: DialogueController,
    pub scheduler: Scheduler,
    pub sprites: SpriteTables,
    pub tweens: TweenTable,
    pub effect: Option<EffectState>,
    pub skip: SkipState,
    pub log: LogState,
    pub save_dir: PathBuf,
    pub quit_requested: bool,
    pub prevent_exit: bool,
    pub strict_warnings: bool,
    pub compositor: Box<dyn Compositor>,
    pub audio: Box<dyn AudioMixer>,
    pub errors: CollectingErrorSink,
    pub bgm_name: Option<String>,
    pub bgm_looping: bool,
    pub bg_name: Option<String>,
    /// The save-visible global slot count (spec.md §4.6 item 1), from a
    /// leading `;value N` header pragma if the scenario declared one.
    pub global_variable_border: u32,
    /// From a leading `;gameid NAME` header pragma, unless the host already
    /// fixed one via config/CLI (`libaurora_platform::config::Config::game_id`).
    pub game_identifier: Option<String>,
    /// From a leading `;mode...@w,h` header pragma.
    pub canvas_size: Option<(i32, i32)>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Suspend,
}

impl Engine {
    pub fn new(script_text: impl Into<String>, labels: Vec<crate::script::label::Label>, save_dir: PathBuf, compositor: Box<dyn Compositor>, audio: Box<dyn AudioMixer>) -> AResult<Self> {
        let script = ScriptBuffer::new(script_text);
        let header = crate::script::header::parse_header_pragmas(&script.text());
        let label_count = labels.len();
        let labels = LabelTable::build(labels)?;
        let lexer = Lexer::new(script.text(), ScriptAddress::from(0u32));
        Ok(Self {
            script,
            labels,
            vars: VariableStore::default(),
            callstack: CallStack::new(),
            lexer,
            current_line: 1,
            dialogue: DialogueController::new(),
            scheduler: Scheduler::new(),
            sprites: SpriteTables::new(),
            tweens: TweenTable::new(),
            effect: None,
            skip: SkipState::new(),
            log: LogState::new(label_count),
            save_dir,
            quit_requested: false,
            prevent_exit: false,
            strict_warnings: false,
            compositor,
            audio,
            errors: CollectingErrorSink::default(),
            bgm_name: None,
            bgm_looping: false,
            bg_name: None,
            global_variable_border: header.global_variable_border.unwrap_or(Self::SAVED_SLOT_COUNT),
            game_identifier: header.game_identifier,
            canvas_size: header.canvas_size,
        })
    }

    /// Convenience over [`Engine::new`] for callers that don't already have
    /// a pre-scanned label table (`aurora`, tests): runs the label-discovery
    /// pass over `script_text` itself.
    pub fn from_script(script_text: impl Into<String>, save_dir: PathBuf, compositor: Box<dyn Compositor>, audio: Box<dyn AudioMixer>) -> AResult<Self> {
        let script_text: String = script_text.into();
        let labels = crate::script::label::scan_labels(std::rc::Rc::from(script_text.as_str()))?;
        Self::new(script_text, labels, save_dir, compositor, audio)
    }

    /// Every script jump goes through here, so this is also where super-skip
    /// early termination (spec.md §4.7, "`goto *L`: ... also attempt early
    /// termination if L is the target") is checked: a jump landing exactly
    /// on the declared destination ends super-skip immediately, rather than
    /// waiting for the choice vector to exhaust. Falling through a
    /// destination label by ordinary sequential reading does *not* trigger
    /// this — only an actual jump does, matching spec.md §4.7's wording.
    pub fn goto_address(&mut self, address: ScriptAddress) {
        self.lexer = Lexer::new(self.script.text(), address);
        if self.skip.is_superskip() && self.skip.superskip_destination().map(str::to_string).and_then(|dest| self.labels.by_name(dest.trim_start_matches('*')).map(|l| l.address)) == Some(address) {
            self.skip.end_superskip();
        }
    }

    pub fn goto_label(&mut self, name: &str) -> AResult<()> {
        let address = self.labels.by_name(name.trim_start_matches('*')).map(|l| l.address).with_context(|| format!("Label *{name} not found"))?;
        self.goto_address(address);
        Ok(())
    }

    /// One frame of the constant-refresh scheduler (spec.md §4.4).
    #[tracing::instrument(level = "debug", skip(self), fields(actions = self.scheduler.len()))]
    pub fn tick(&mut self, elapsed_ms: u32) -> AResult<()> {
        let audio = &self.audio;
        let expired = self.scheduler.tick(elapsed_ms, |channel| audio.is_channel_finished(ChannelId::from(channel)));
        for action in expired {
            self.on_action_expired(action.kind);
        }
        self.dialogue.tick(elapsed_ms);
        while let Some(event) = self.dialogue.pop_event() {
            self.handle_dialogue_event(event);
        }
        for action in self.scheduler.actions_mut() {
            if let ActionKind::WaitOnDialogue { index } = action.kind {
                if self.dialogue.consume_pipe(index) {
                    action.terminate();
                }
            }
        }
        if let Some(effect) = &mut self.effect {
            if effect.tick(elapsed_ms) {
                self.effect = None;
            }
        }
        self.tick_sprite_tweens();
        if self.scheduler.main_script_permitted() {
            self.run_until_suspended()?;
        }
        Ok(())
    }

    fn on_action_expired(&mut self, kind: ActionKind) {
        let _ = kind;
    }

    /// Advances every in-flight sprite property tween (spec.md §4.5) and
    /// writes the interpolated value back into the sprite table. Non-sprite
    /// targets (spriteset/global/layer knobs) have no write-back site yet.
    fn tick_sprite_tweens(&mut self) {
        let now_ticks = self.scheduler.ticks_now();
        for (target, property) in self.tweens.active_keys() {
            if let crate::property::TargetRef::Sprite { id, class } = target {
                if let Some(value) = self.tweens.tick(target, property, now_ticks) {
                    self.sprites.get_mut(crate::sprite::SpriteRef { id, class }).set_property_value(property, value);
                }
            }
        }
    }

    fn handle_dialogue_event(&mut self, event: DialogueEvent) {
        match event {
            DialogueEvent::PipeReached(_) | DialogueEvent::LineFinished | DialogueEvent::InlineCommandEnd => {}
            DialogueEvent::InlineCommand { .. } => {
                self.dialogue.resume();
            }
        }
    }

    /// Reads and dispatches commands until a live action suspends the
    /// script, the script requests quit, or EOF.
    pub fn run_until_suspended(&mut self) -> AResult<()> {
        loop {
            if !self.scheduler.main_script_permitted() || self.quit_requested {
                return Ok(());
            }
            let start = self.lexer.position();
            let token = self.lexer.read_token()?;
            use crate::script::lexer::Token;
            match token {
                Token::Eof => {
                    self.quit_requested = true;
                    return Ok(());
                }
                Token::Newline => {
                    self.current_line += 1;
                    continue;
                }
                Token::Colon | Token::Label(_) => continue,
                Token::Command(name) => {
                    let flow = self.dispatch(&name)?;
                    let end = self.lexer.position();
                    self.script.kidoku.mark_range(start, end);
                    if self.skip.superskip_choices_exhausted() {
                        self.skip.end_superskip();
                    }
                    if flow == Flow::Suspend {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs one command via the dispatch table. The lexer is taken out of
    /// `self` for the duration of the call so the handler can hold `&mut
    /// Engine` and `&mut Lexer` at once without aliasing `self.lexer`.
    fn dispatch(&mut self, name: &str) -> AResult<Flow> {
        let mut lexer = std::mem::take(&mut self.lexer);
        let result = crate::script::dispatch::run(self, &mut lexer, name);
        // A handler that jumped (`goto`/`gosub`/`return`/`next`/`sskip`, via
        // `goto_address`) already replaced `self.lexer` with the new
        // position; only the non-jumping case needs the advanced copy
        // written back.
        if self.lexer.is_unset() {
            self.lexer = lexer;
        }
        if let Err(err) = &result {
            tracing::warn!(command = name, error = %err, "command dispatch failed");
            fatal(&mut self.errors, "Parse error", err, vec![]);
        }
        result
    }

    /// `wait N`: registers a blocking wait, shrunk per the active skip mode
    /// (spec.md §4.7, §8 scenario 6).
    pub fn register_wait(&mut self, ms: u32) {
        let ms = if self.skip.is_skipping() { crate::skip::shrink_wait_ms(ms).min(ms) } else { ms };
        if ms == 0 {
            return;
        }
        self.scheduler.register(ActionKind::Wait { remaining_ms: ms, internal_slowdown_counter: 0 }, EventMode::empty());
    }

    pub fn savegame(&mut self, slot: u32) -> AResult<()> {
        tracing::info!(slot, "saving game");
        let header = save::SaveHeader::current(1, 1, 2026, 0, 0);
        let state = self.snapshot_for_save();
        save::write_save(&save::slot_path(&self.save_dir, slot), &header, &state)
    }

    pub fn loadgame(&mut self, slot: u32) -> AResult<()> {
        tracing::info!(slot, "loading game");
        let (_, state) = save::read_save(&save::slot_path(&self.save_dir, slot))?;
        self.restore_from_save(&state);
        Ok(())
    }

    /// Default for [`Engine::global_variable_border`] (spec.md §4.6 item 1)
    /// when the scenario declares no `;value` header pragma.
    const SAVED_SLOT_COUNT: u32 = 64;

    fn snapshot_for_save(&mut self) -> save::SaveState {
        let global_border = self.global_variable_border;
        let ints = (0..global_border).map(|n| self.vars.int(n)).collect();
        let strings = (0..global_border).map(|n| self.vars.string(n)).collect();
        let arrays = self
            .vars
            .arrays_in_declaration_order()
            .into_iter()
            .map(|array| save::ArraySnapshot { no: array.no, dims: array.dims.clone(), data: array.flat_values().to_vec() })
            .collect();
        let prnum = self.sprites.prnum.iter().map(|s| s.cell_index as i32).collect();
        let bar = self.sprites.bars.iter().map(|s| s.cell_index as i32).collect();
        let current_label = self.labels.by_address(self.lexer.position()).map(|l| l.name.clone()).unwrap_or_default();
        let no_transition = self.sprites.no_transition.iter().filter(|r| r.class == crate::sprite::SpriteClass::Lsp).map(|r| r.id).collect();
        save::SaveState {
            global_border,
            ints,
            strings,
            arrays,
            current_label,
            current_line: self.current_line,
            // Repurposed as the exact resume address rather than an
            // intra-line command count: precise enough to resume a jump
            // mid-line, which label+line alone can't express.
            command_index: self.lexer.position().get(),
            bg_image_name: self.bg_name.clone().unwrap_or_default(),
            sprites: self.sprites.lsp.iter().map(encode_sprite).collect(),
            sprites2: self.sprites.lsp2.iter().map(encode_sprite).collect(),
            no_transition,
            callstack: self.callstack.frames().iter().map(encode_frame).collect(),
            skip_mode: self.skip.mode.bits(),
            choice_vector: self.skip.choice_vector().to_vec(),
            accept_choice_next_index: self.skip.accept_choice_next_index() as u32,
            bgm_name: self.bgm_name.clone().unwrap_or_default(),
            bgm_looping: self.bgm_looping,
            prnum,
            bar,
            description: String::new(),
        }
    }

    fn restore_from_save(&mut self, state: &save::SaveState) {
        for (n, &value) in state.ints.iter().enumerate() {
            self.vars.set_int(n as u32, value);
        }
        for (n, value) in state.strings.iter().enumerate() {
            self.vars.set_string(n as u32, value.clone());
        }
        for array in &state.arrays {
            let _ = self.vars.restore_array(array.no, array.dims.clone(), &array.data);
        }
        self.bg_name = if state.bg_image_name.is_empty() { None } else { Some(state.bg_image_name.clone()) };
        for (n, &value) in state.prnum.iter().enumerate().take(crate::sprite::PRNUM_COUNT) {
            self.sprites.prnum[n].cell_index = value.max(0) as u32;
        }
        for (n, &value) in state.bar.iter().enumerate().take(crate::sprite::BAR_COUNT) {
            self.sprites.bars[n].cell_index = value.max(0) as u32;
        }
        for (n, snapshot) in state.sprites.iter().enumerate().take(crate::sprite::SPRITE_COUNT) {
            decode_sprite(&mut self.sprites.lsp[n], snapshot);
        }
        for (n, snapshot) in state.sprites2.iter().enumerate().take(crate::sprite::SPRITE_COUNT) {
            decode_sprite(&mut self.sprites.lsp2[n], snapshot);
        }
        self.sprites.no_transition = state.no_transition.iter().map(|&id| crate::sprite::SpriteRef { id, class: crate::sprite::SpriteClass::Lsp }).collect();
        self.callstack.restore_frames(state.callstack.iter().map(decode_frame).collect());
        self.skip.mode = crate::skip::SkipMode::from_bits_truncate(state.skip_mode);
        self.skip.restore_choice_state(state.choice_vector.clone(), state.accept_choice_next_index as usize);
        self.current_line = state.current_line;
        self.goto_address(ScriptAddress::from(state.command_index));
        self.bgm_looping = state.bgm_looping;
        self.bgm_name = if state.bgm_name.is_empty() { None } else { Some(state.bgm_name.clone()) };
        if let Some(name) = &self.bgm_name {
            let _ = self.audio.play_bgm(name, self.bgm_looping);
        }
    }
}

/// Lossy by construction: a save snapshot keeps position, transparency and
/// the image name, not the full tween/parent/cell animation state (spec.md
/// §4.6 item 9).
fn encode_sprite(sprite: &crate::sprite::AnimationInfo) -> save::SpriteSnapshot {
    save::SpriteSnapshot { x: sprite.script_rect.x, y: sprite.script_rect.y, alpha: sprite.alpha, visible: sprite.visible, image_name: sprite.image_name.clone().unwrap_or_default() }
}

fn decode_sprite(sprite: &mut crate::sprite::AnimationInfo, snapshot: &save::SpriteSnapshot) {
    sprite.script_rect.x = snapshot.x;
    sprite.script_rect.y = snapshot.y;
    sprite.alpha = snapshot.alpha;
    sprite.visible = snapshot.visible;
    sprite.image_name = if snapshot.image_name.is_empty() { None } else { Some(snapshot.image_name.clone()) };
}

/// `For` frames pack their induction variable slot into
/// `label_or_induction_name` as decimal text — [`save::CallFrameSnapshot`]
/// has no spare integer field, and a for-frame never needs the name field
/// for anything else.
fn encode_frame(frame: &crate::callstack::Frame) -> save::CallFrameSnapshot {
    use crate::callstack::Frame;
    match frame {
        Frame::Label(label) => save::CallFrameSnapshot { is_for: false, address: label.return_address.get(), label_or_induction_name: label.return_label.clone(), line_or_bound: label.return_line as i32, step: 0 },
        Frame::For(for_frame) => {
            save::CallFrameSnapshot { is_for: true, address: for_frame.next_script_address.get(), label_or_induction_name: for_frame.induction_var_no.to_string(), line_or_bound: for_frame.to, step: for_frame.step }
        }
    }
}

fn decode_frame(snapshot: &save::CallFrameSnapshot) -> crate::callstack::Frame {
    use crate::callstack::{Frame, ForFrame, LabelFrame};
    if snapshot.is_for {
        Frame::For(ForFrame {
            next_script_address: ScriptAddress::from(snapshot.address),
            induction_var_no: snapshot.label_or_induction_name.parse().unwrap_or(0),
            to: snapshot.line_or_bound,
            step: snapshot.step,
            break_flag: false,
        })
    } else {
        Frame::Label(LabelFrame {
            return_address: ScriptAddress::from(snapshot.address),
            return_label: snapshot.label_or_induction_name.clone(),
            return_line: snapshot.line_or_bound as u32,
            pushed_string_buffer_offset: None,
            dialogue_event_on_return: false,
            uninterruptible: false,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sprite::{SpriteClass, SpriteRef};

    fn engine(script: &str) -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::from_script(
            script,
            dir.path().to_path_buf(),
            Box::<libaurora_platform::compositor::NullCompositor>::default(),
            Box::<libaurora_platform::audio::NullAudioMixer>::default(),
        )
        .unwrap();
        (dir, engine)
    }

    #[test]
    fn savegame_and_loadgame_round_trip_sprite_position_and_callstack_depth() {
        let (_dir, mut engine) = engine(
            "*start\n\
             lsp 0, \"a.png\", 50, 60\n\
             gosub *sub\n\
             end\n\
             *sub\n\
             savegame 0\n\
             end\n",
        );
        engine.run_until_suspended().unwrap();

        let sprite_ref = SpriteRef { id: 0, class: SpriteClass::Lsp };
        assert_eq!(engine.sprites.get(sprite_ref).script_rect.x, 50);
        assert_eq!(engine.callstack.depth(), 1);

        engine.sprites.get_mut(sprite_ref).script_rect.x = 999;
        engine.callstack.clear();
        assert_eq!(engine.callstack.depth(), 0);

        engine.loadgame(0).unwrap();

        assert_eq!(engine.sprites.get(sprite_ref).script_rect.x, 50);
        assert_eq!(engine.sprites.get(sprite_ref).script_rect.y, 60);
        assert_eq!(engine.callstack.depth(), 1);
    }

    #[test]
    fn a_value_header_pragma_narrows_the_saved_global_border() {
        let (_dir, engine) = engine(";value 4\n*start\nend\n");
        assert_eq!(engine.global_variable_border, 4);
    }

    #[test]
    fn with_no_header_pragma_the_global_border_keeps_its_default() {
        let (_dir, engine) = engine("*start\nend\n");
        assert_eq!(engine.global_variable_border, Engine::SAVED_SLOT_COUNT);
    }

    #[test]
    fn savegame_and_loadgame_round_trip_skip_state() {
        let (_dir, mut engine) = engine("*start\nmakechoice 7\nmakechoice 3\nsavegame 0\nend\n");
        engine.run_until_suspended().unwrap();
        assert_eq!(engine.skip.choice_vector(), &[7, 3]);

        engine.skip.restore_choice_state(vec![], 0);
        assert!(engine.skip.choice_vector().is_empty());

        engine.loadgame(0).unwrap();
        assert_eq!(engine.skip.choice_vector(), &[7, 3]);
    }
}
