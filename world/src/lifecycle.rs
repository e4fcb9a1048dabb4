//! Spawn, touch, pulse and free operations of the node pool.

use glam::Vec2;
use pulse_field_core::{
    AnimFrame, Collaborators, Event, NodeId, NodeKind, NoteTrigger, SpriteImage,
};
use pulse_field_system_modulation::{
    envelope_alpha, envelope_table, initial_pulse_period_scale, lifespan_fade, note_length,
    octave_for, pulse_interval, pulse_period_scale, stereo_volume, AMPLITUDE_MODULATION,
    FREQUENCY_MODULATION, MODULATOR_CENTER, NOTE_LENGTH,
};
use rand::Rng;

use crate::{
    pool::{Node, NodeHandles},
    World,
};

const WANDER_STEP: f32 = 0.5;
const MIN_NOTE_VELOCITY: f32 = 0.5;
const MAX_NOTE_VELOCITY: f32 = 1.0;
const PULSE_SALT: u64 = 1_000;

impl World {
    pub(crate) fn spawn_node(
        &mut self,
        kind: NodeKind,
        position: Vec2,
        collaborators: &mut Collaborators<'_>,
        out_events: &mut Vec<Event>,
    ) {
        let now = self.clock.now();
        let reserve = self.pool.capacity() - 1;

        if self.pool.live_count() >= reserve {
            if let Some(index) = self.pool.first_live() {
                let death_time = now.saturating_add(self.fade_buffer);
                self.pool.node_mut(index).death_time = death_time;
                tracing::debug!(slot = index, death = death_time.get(), "evicting node");
                out_events.push(Event::NodeEvicted {
                    node: NodeId::new(index as u32),
                    death_time,
                });
            }
        }

        let slot = if self.pool.live_count() >= reserve {
            None
        } else {
            self.pool.allocate()
        };
        let Some(index) = slot else {
            tracing::debug!(?kind, x = position.x, y = position.y, "pool full, spawn dropped");
            out_events.push(Event::SpawnDropped { kind, position });
            return;
        };

        let cell = self.grid.cell_for(position);
        self.grid.increment(cell);
        let quadrant = self.screen.quadrant_of(position);

        let audio = &mut *collaborators.audio;
        let voice = audio.create_voice(kind.waveform());
        let frequency_modulator = audio.create_modulator(kind.modulator_shape());
        let amplitude_modulator = audio.create_modulator(kind.modulator_shape());
        audio.set_modulator_center(frequency_modulator, MODULATOR_CENTER);
        audio.set_modulator_center(amplitude_modulator, MODULATOR_CENTER);
        audio.set_frequency_modulator(voice, frequency_modulator);
        audio.set_amplitude_modulator(voice, amplitude_modulator);
        audio.add_to_channel(voice);

        let sprites = &mut *collaborators.sprites;
        let sprite = sprites.create_sprite(SpriteImage::Node {
            kind,
            frame: AnimFrame::FIRST,
        });
        sprites.move_to(sprite, position);
        sprites.add_to_scene(sprite);

        self.pool.occupy(
            index,
            Node {
                kind,
                position,
                cell,
                quadrant,
                death_time: now.saturating_add(self.lifetime),
                next_pulse: now,
                pulse_period_scale: initial_pulse_period_scale(),
                note_length: NOTE_LENGTH.min(),
                octave: 0,
                frame: AnimFrame::FIRST,
                handles: NodeHandles {
                    voice,
                    frequency_modulator,
                    amplitude_modulator,
                    sprite,
                },
            },
        );
        tracing::debug!(slot = index, ?kind, ?cell, ?quadrant, "node spawned");
        out_events.push(Event::NodeSpawned {
            node: NodeId::new(index as u32),
            kind,
            cell,
            quadrant,
        });

        self.touch_node(index, collaborators, out_events);
    }

    /// Re-derives every parameter of a live node and pulses it if due.
    ///
    /// # Panics
    ///
    /// Panics if the slot is out of range or dead.
    pub(crate) fn touch_node(
        &mut self,
        index: usize,
        collaborators: &mut Collaborators<'_>,
        out_events: &mut Vec<Event>,
    ) {
        let now = self.clock.now();
        if now > self.pool.node_mut(index).death_time {
            self.free_node(index, collaborators, out_events);
            return;
        }

        let capacity = self.pool.capacity();
        let Self {
            screen,
            grid,
            pool,
            pitch,
            rng,
            lifetime,
            fade_buffer,
            slow_base_pulse,
            fast_base_pulse,
            ..
        } = self;
        let node = pool.node_mut(index);
        let handles = node.handles;
        let audio = &mut *collaborators.audio;

        let proximity = grid.proximity_score(node.cell, capacity);
        let isolation = 1.0 - proximity;
        let frequency = FREQUENCY_MODULATION.at(isolation);
        audio.set_modulator_rate(handles.frequency_modulator, frequency.rate);
        audio.set_modulator_phase(handles.frequency_modulator, frequency.phase);
        audio.set_modulator_depth(handles.frequency_modulator, frequency.depth);
        let amplitude = AMPLITUDE_MODULATION.at(isolation);
        audio.set_modulator_rate(handles.amplitude_modulator, amplitude.rate);
        audio.set_modulator_phase(handles.amplitude_modulator, amplitude.phase);
        audio.set_modulator_depth(handles.amplitude_modulator, amplitude.depth);

        node.octave = octave_for(node.position.y, screen.height());

        let age = envelope_alpha(now, node.death_time, *lifetime);
        audio.set_envelope(handles.voice, envelope_table(node.kind).at(age));

        let fade = lifespan_fade(now, node.death_time, *fade_buffer);
        audio.set_volume(
            handles.voice,
            stereo_volume(fade, proximity, node.position.x, screen.width()),
        );

        let centrality = screen.closeness_to_center(node.position);
        node.note_length = note_length(centrality);
        node.pulse_period_scale = pulse_period_scale(centrality);

        let step = Vec2::new(wander(rng), wander(rng));
        node.position = screen.wrap(node.position + step);
        collaborators.sprites.move_to(handles.sprite, node.position);

        node.frame = node.frame.next();
        collaborators.sprites.set_image(
            handles.sprite,
            SpriteImage::Node {
                kind: node.kind,
                frame: node.frame,
            },
        );

        if now >= node.next_pulse {
            let note = NoteTrigger {
                pitch: pitch.choose_pitch(rng, node.quadrant, node.octave),
                velocity: rng.gen_range(MIN_NOTE_VELOCITY..=MAX_NOTE_VELOCITY),
                duration: node.note_length,
            };
            audio.play_note(handles.voice, note);
            let salt = rng.gen_range(0..PULSE_SALT);
            let interval = pulse_interval(node.pulse_period_scale, *slow_base_pulse, *fast_base_pulse);
            node.next_pulse = now.saturating_add(interval).saturating_add(salt);
            tracing::trace!(
                slot = index,
                pitch = note.pitch,
                next = node.next_pulse.get(),
                "node pulsed"
            );
            out_events.push(Event::NotePlayed {
                node: NodeId::new(index as u32),
                note,
                next_pulse: node.next_pulse,
            });
        }
    }

    /// Releases every handle of a live node and marks its slot dead.
    ///
    /// # Panics
    ///
    /// Panics if the slot is dead.
    pub(crate) fn free_node(
        &mut self,
        index: usize,
        collaborators: &mut Collaborators<'_>,
        out_events: &mut Vec<Event>,
    ) {
        let node = self.pool.release(index);
        let handles = node.handles;

        let audio = &mut *collaborators.audio;
        audio.remove_from_channel(handles.voice);
        audio.destroy_modulator(handles.frequency_modulator);
        audio.destroy_modulator(handles.amplitude_modulator);
        audio.destroy_voice(handles.voice);

        let sprites = &mut *collaborators.sprites;
        sprites.remove_from_scene(handles.sprite);
        sprites.destroy_sprite(handles.sprite);

        self.grid.decrement(node.cell);
        tracing::debug!(slot = index, live = self.pool.live_count(), "node freed");
        out_events.push(Event::NodeFreed {
            node: NodeId::new(index as u32),
            cell: node.cell,
        });
    }
}

fn wander<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    if rng.gen_bool(0.5) {
        WANDER_STEP
    } else {
        -WANDER_STEP
    }
}
