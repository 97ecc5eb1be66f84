// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use caption_speech_node::{
    session::ShellPhase,
    shell::{ImageSource, ListenOutcome, Shell, ShellEvent},
    vision::{fetch::DEFAULT_FETCH_TIMEOUT, CaptionPipeline, ImageFetcher, ModelLoader},
    SessionState,
};
use std::sync::Arc;

use crate::common::{png_bytes, FakeCaptioner, FakeSpeech, FAKE_MP3};

fn shell(captioner: Arc<FakeCaptioner>, speech: Arc<FakeSpeech>) -> Shell {
    let loader = Arc::new(ModelLoader::preloaded("fake", captioner));
    Shell::new(
        Arc::new(CaptionPipeline::new(loader, 32, 8)),
        speech,
        ImageFetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap(),
    )
}

fn upload(name: &str, color: [u8; 3]) -> ImageSource {
    ImageSource::Upload {
        file_name: Some(name.to_string()),
        bytes: png_bytes(64, 64, color),
    }
}

#[tokio::test]
async fn test_full_flow_on_gray_image() {
    let captioner = Arc::new(FakeCaptioner::new("a gray background"));
    let speech = Arc::new(FakeSpeech::default());
    let shell = shell(captioner.clone(), speech.clone());
    let mut state = SessionState::new();

    assert_eq!(state.phase(), ShellPhase::NoImage);

    let event = shell.select_image(&mut state, upload("gray.png", [128, 128, 128])).await;
    assert!(matches!(event, ShellEvent::ImageSelected { .. }));
    assert_eq!(state.phase(), ShellPhase::ImageSelected);

    let event = shell.generate(&mut state).await;
    assert_eq!(event, ShellEvent::caption("a gray background"));
    assert_eq!(state.phase(), ShellPhase::CaptionPresent);
    assert_eq!(captioner.budgets(), vec![32]);

    match shell.listen(&state).await {
        ListenOutcome::Audio(clip) => {
            assert_eq!(clip.data.as_ref(), FAKE_MP3);
            assert_eq!(clip.format.mime_type(), "audio/mpeg");
        }
        other => panic!("expected audio, got {other:?}"),
    }
    assert_eq!(speech.spoken(), vec!["a gray background"]);
}

#[tokio::test]
async fn test_caption_survives_image_change() {
    let captioner = Arc::new(FakeCaptioner::new("a red square"));
    let shell = shell(captioner, Arc::new(FakeSpeech::default()));
    let mut state = SessionState::new();

    shell.select_image(&mut state, upload("red.png", [255, 0, 0])).await;
    shell.generate(&mut state).await;
    shell.select_image(&mut state, upload("blue.png", [0, 0, 255])).await;

    // the old caption stays until the next successful generation
    assert_eq!(state.caption(), "a red square");
    let view = shell.view(&state);
    assert_eq!(view.caption.as_deref(), Some("a red square"));
    assert_eq!(view.image.unwrap().width, 64);
}

#[tokio::test]
async fn test_generate_after_clear_warns() {
    let captioner = Arc::new(FakeCaptioner::new("x"));
    let shell = shell(captioner.clone(), Arc::new(FakeSpeech::default()));
    let mut state = SessionState::new();

    shell.select_image(&mut state, upload("a.png", [1, 1, 1])).await;
    assert_eq!(
        shell.clear_image(&mut state),
        ShellEvent::ImageCleared { had_image: true }
    );
    assert_eq!(
        shell.clear_image(&mut state),
        ShellEvent::ImageCleared { had_image: false }
    );

    let event = shell.generate(&mut state).await;
    assert!(event.is_warning());
    assert_eq!(captioner.calls(), 0);
}

#[tokio::test]
async fn test_upload_without_file_name_is_decoded() {
    let shell = shell(
        Arc::new(FakeCaptioner::new("x")),
        Arc::new(FakeSpeech::default()),
    );
    let mut state = SessionState::new();

    let event = shell
        .select_image(
            &mut state,
            ImageSource::Upload {
                file_name: None,
                bytes: png_bytes(8, 4, [9, 9, 9]),
            },
        )
        .await;
    match event {
        ShellEvent::ImageSelected { image, .. } => {
            assert_eq!((image.width, image.height), (8, 4));
            assert_eq!(image.format, "png");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_listen_speaks_latest_caption() {
    let captioner = Arc::new(FakeCaptioner::with_replies(
        "unused",
        vec![Ok("first".to_string()), Ok("second".to_string())],
    ));
    let speech = Arc::new(FakeSpeech::default());
    let shell = shell(captioner, speech.clone());
    let mut state = SessionState::new();

    shell.select_image(&mut state, upload("a.png", [1, 1, 1])).await;
    shell.generate(&mut state).await;
    shell.listen(&state).await;
    shell.generate(&mut state).await;
    shell.listen(&state).await;

    assert_eq!(speech.spoken(), vec!["first", "second"]);
}
