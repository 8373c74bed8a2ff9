//! Media kind detection.

use serde::Serialize;

/// File extensions treated as video content.
const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "webm", "mov", "m4v", "ogv"];

/// Broad content category of a media reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a reference by its file extension, ignoring any query or
    /// fragment. Anything that is not a known video extension is an image.
    pub fn from_reference(reference: &str) -> Self {
        let path = reference
            .split(['?', '#'])
            .next()
            .unwrap_or(reference);
        let name = super::file_name(path);

        let is_video = name
            .rsplit_once('.')
            .map(|(_, ext)| {
                VIDEO_EXTENSIONS
                    .iter()
                    .any(|video| ext.eq_ignore_ascii_case(video))
            })
            .unwrap_or(false);

        if is_video {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    /// Classifies a `Content-Type` header value. Returns None for anything
    /// that is neither `image/*` nor `video/*`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn is_video(self) -> bool {
        self == MediaKind::Video
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_extensions() {
        assert_eq!(MediaKind::from_reference("tour.mp4"), MediaKind::Video);
        assert_eq!(
            MediaKind::from_reference("https://cdn.example.com/a/walkthrough.WEBM"),
            MediaKind::Video
        );
        assert_eq!(
            MediaKind::from_reference("/media/clip.mov?v=2#t=10"),
            MediaKind::Video
        );
    }

    #[test]
    fn test_everything_else_is_image() {
        assert_eq!(MediaKind::from_reference("facade.jpg"), MediaKind::Image);
        assert_eq!(MediaKind::from_reference("no-extension"), MediaKind::Image);
        assert_eq!(MediaKind::from_reference("mp4/plan.png"), MediaKind::Image);
        assert_eq!(MediaKind::from_reference(""), MediaKind::Image);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(
            MediaKind::from_content_type("image/webp"),
            Some(MediaKind::Image)
        );
        assert_eq!(
            MediaKind::from_content_type("Video/MP4; codecs=avc1"),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::from_content_type("text/html; charset=utf-8"), None);
    }
}
