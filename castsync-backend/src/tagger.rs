use chrono::{DateTime, Datelike, Utc};
use id3::frame::{Comment, Picture, PictureType};
use id3::{TagLike, Timestamp, Version};
use std::fs::{File, FileTimes};
use std::path::Path;
use std::time::SystemTime;

use crate::cover::CoverArt;
use crate::error::Result;

const MAX_TITLE_LEN: usize = 100;

/// What ends up in the ID3 tag of one download.
#[derive(Debug, Clone)]
pub(crate) struct TrackTags<'a> {
    pub(crate) artist: &'a str,
    pub(crate) album: Option<&'a str>,
    pub(crate) genre: Option<&'a str>,
    pub(crate) title: &'a str,
    pub(crate) comment: Option<&'a str>,
    pub(crate) published: DateTime<Utc>,
    pub(crate) track: u32,
}

/// Replace any ID3 tag in `path` with an ID3v2.4 tag built from `tags`.
pub(crate) fn write_tags(path: &Path, tags: &TrackTags<'_>, cover: Option<&CoverArt>) -> Result<()> {
    let mut tag = id3::Tag::new();
    tag.set_artist(tags.artist);
    tag.set_album_artist(tags.artist);
    if let Some(album) = tags.album {
        tag.set_album(album);
    }
    tag.set_title(tags.title.chars().take(MAX_TITLE_LEN).collect::<String>());
    if let Some(text) = tags.comment {
        let _ = tag.add_frame(Comment {
            lang: "eng".to_owned(),
            description: String::new(),
            text: text.to_owned(),
        });
    }
    let date = tags.published.date_naive();
    tag.set_date_released(Timestamp {
        year: date.year(),
        month: u8::try_from(date.month()).ok(),
        day: u8::try_from(date.day()).ok(),
        hour: None,
        minute: None,
        second: None,
    });
    tag.set_date_recorded(Timestamp {
        year: date.year(),
        month: None,
        day: None,
        hour: None,
        minute: None,
        second: None,
    });
    if let Some(genre) = tags.genre {
        tag.set_genre(genre);
    }
    tag.set_track(tags.track);
    tag.set_disc(1);
    tag.set_total_discs(1);
    if let Some(cover) = cover {
        let _ = tag.add_frame(Picture {
            mime_type: cover.mime_type.to_owned(),
            picture_type: PictureType::CoverFront,
            description: String::new(),
            data: cover.data.to_vec(),
        });
    }
    tag.write_to_path(path, Version::Id3v24)?;
    Ok(())
}

/// Make the file look as old as the entry it came from.
pub(crate) fn set_file_times(path: &Path, published: DateTime<Utc>) -> Result<()> {
    let at = SystemTime::from(published);
    let times = FileTimes::new().set_accessed(at).set_modified(at);
    File::options().write(true).open(path)?.set_times(times)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tags_and_times_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20230103_second.mp3");
        std::fs::write(&path, b"\xFF\xFB\x90\x64fake mpeg frame").unwrap();
        let published = Utc.with_ymd_and_hms(2023, 1, 3, 12, 30, 0).unwrap();
        let long_title = "x".repeat(150);
        let cover = CoverArt {
            data: bytes::Bytes::from_static(b"\xFF\xD8\xFFjpeg"),
            mime_type: "image/jpeg",
        };

        write_tags(
            &path,
            &TrackTags {
                artist: "The Show",
                album: Some("Album"),
                genre: Some("Podcast"),
                title: &long_title,
                comment: Some("notes"),
                published,
                track: 2,
            },
            Some(&cover),
        )
        .unwrap();
        set_file_times(&path, published).unwrap();

        let tag = id3::Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.artist(), Some("The Show"));
        assert_eq!(tag.album_artist(), Some("The Show"));
        assert_eq!(tag.album(), Some("Album"));
        assert_eq!(tag.genre(), Some("Podcast"));
        assert_eq!(tag.title().map(str::len), Some(MAX_TITLE_LEN));
        assert_eq!(tag.track(), Some(2));
        assert_eq!(tag.disc(), Some(1));
        assert_eq!(tag.total_discs(), Some(1));
        assert_eq!(tag.date_released().map(|d| (d.year, d.month, d.day)), Some((2023, Some(1), Some(3))));
        assert_eq!(tag.pictures().count(), 1);
        assert_eq!(tag.comments().next().map(|c| c.text.as_str()), Some("notes"));

        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(modified, SystemTime::from(published));
    }
}
