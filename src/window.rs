use crate::trainer::Trainer;
use flappy::{
    ControlPolicy, EpisodeContext, FrameRenderer, ManualPolicy, PopulationEvaluator, Renderer,
};
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{error, info};
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

pub enum Mode {
    Train(Trainer),
    Play,
}

enum Step {
    Continue,
    Done,
}

struct Session {
    context: EpisodeContext,
    mode: Mode,
    evaluator: Option<PopulationEvaluator>,
    flap: Option<Arc<AtomicBool>>,
    generations_done: u32,
}

impl Session {
    fn new(context: EpisodeContext, mode: Mode) -> anyhow::Result<Self> {
        let mut session = Self { context, mode, evaluator: None, flap: None, generations_done: 0 };
        session.start_episode()?;
        Ok(session)
    }

    fn start_episode(&mut self) -> anyhow::Result<()> {
        let policies: Vec<Box<dyn ControlPolicy>> = match &self.mode {
            Mode::Train(trainer) => trainer.policies(),
            Mode::Play => {
                let manual = ManualPolicy::new();
                self.flap = Some(manual.trigger());
                vec![Box::new(manual)]
            }
        };
        self.evaluator = Some(PopulationEvaluator::new(&mut self.context, policies)?);
        Ok(())
    }

    fn flap(&self) {
        if let Some(flap) = &self.flap {
            flap.store(true, Ordering::Release);
        }
    }

    fn running(&self) -> bool {
        self.evaluator.as_ref().is_some_and(|e| e.state().is_running())
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        if matches!(self.mode, Mode::Play) && !self.running() {
            info!("restarting");
            self.start_episode()?;
        }
        Ok(())
    }

    fn step(&mut self, renderer: &mut dyn Renderer) -> anyhow::Result<Step> {
        if self.running() {
            if let Some(evaluator) = self.evaluator.as_mut() {
                evaluator.tick(renderer);
            }
            return Ok(Step::Continue);
        }

        let Mode::Train(trainer) = &mut self.mode else {
            // Dead player: wait for a restart.
            return Ok(Step::Continue);
        };
        let Some(evaluator) = self.evaluator.take() else {
            return Ok(Step::Done);
        };
        trainer.evolve(&evaluator.finish());
        self.generations_done += 1;
        if self.generations_done >= self.context.config().episode.generations {
            return Ok(Step::Done);
        }
        self.start_episode()?;
        Ok(Step::Continue)
    }

    fn abort(&mut self) {
        if let Some(evaluator) = self.evaluator.as_mut() {
            evaluator.abort();
        }
    }

    fn title(&self) -> String {
        let Some(evaluator) = &self.evaluator else {
            return "flappy".to_string();
        };
        format!(
            "flappy | gen {} | score {} | alive {}",
            evaluator.generation(),
            evaluator.score(),
            evaluator.live()
        )
    }
}

pub fn run(context: EpisodeContext, mode: Mode) -> anyhow::Result<()> {
    let field = context.config().field.clone();
    let interval = context.tick_interval();

    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();
    let window = WindowBuilder::new()
        .with_title("flappy")
        .with_inner_size(LogicalSize::new(field.width as f64, field.height as f64))
        .with_resizable(false)
        .build(&event_loop)?;

    let mut pixels = {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, &window);
        Pixels::new(field.width, field.height, surface)?
    };

    let mut session = Session::new(context, mode)?;
    let mut last_tick = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            if let Err(err) = pixels.render() {
                error!("pixels render failed: {err}");
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape)
                || input.close_requested()
                || input.destroyed()
            {
                session.abort();
                *control_flow = ControlFlow::Exit;
                return;
            }
            if input.key_pressed(VirtualKeyCode::Space) {
                session.flap();
            }
            if input.key_pressed(VirtualKeyCode::R) {
                if let Err(err) = session.restart() {
                    error!("restart failed: {err:#}");
                    *control_flow = ControlFlow::Exit;
                    return;
                }
            }

            if last_tick.elapsed() >= interval {
                last_tick = Instant::now();
                let frame = pixels.frame_mut();
                let mut renderer =
                    FrameRenderer::new(frame, field.width, field.height, field.draw_lines);
                match session.step(&mut renderer) {
                    Ok(Step::Continue) => {}
                    Ok(Step::Done) => {
                        info!("training finished");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                    Err(err) => {
                        error!("{err:#}");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                }
                window.set_title(&session.title());
            }
            window.request_redraw();
        }
    });
}
